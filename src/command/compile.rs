/*
 * QMK build wrapper
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! compileサブコマンドの実装
//!

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use log::{debug, info};

use crate::cmd_args::{CompileOpts, Options};
use crate::qmk::rot::{rot, CipherKeys};
use crate::qmk::{
    artifact_name, default_file_reader, default_file_writer, ArtifactSuffix,
    CodeFile, FileReader, FileWriter,
};
use super::shell::{
    default_compile_launcher, default_version_query, CompileLauncher,
    VersionQuery,
};
use super::{CommandContext, DIR_NOT_SET};

/// 時刻取得手順の型
pub(crate) type Clock = dyn Fn() -> DateTime<Local> + Send + Sync;

/// ヘッダに埋め込むバージョン識別子の最大長
const VERSION_LEN: usize = 6;

///
/// ビルド要求の内容をパックした構造体
///
/// # 注記
/// コードは秘密情報を含み得るため、Debugの導出およびログへの出力は行わない
/// こと。
///
struct BuildRequest {
    /// ビルド対象のキーボード識別子
    keyboard: String,

    /// ビルド対象のキーマップ識別子
    keymap: String,

    /// ヘッダに埋め込むコード(1番目)
    code1: String,

    /// ヘッダに埋め込むコード(2番目)
    code2: String,

    /// コードを鍵で変換してから埋め込むか否かを表すフラグ
    use_hash: bool,

    /// ビルド成果物の形式
    suffix: ArtifactSuffix,
}

///
/// compileサブコマンドのコンテキスト情報をパックした構造体
///
struct CompileCommandContext {
    /// QMKツリーのルートディレクトリ
    qmk_dir: PathBuf,

    /// 成果物の出力先ディレクトリ
    output_dir: PathBuf,

    /// ビルド要求の内容
    request: BuildRequest,

    /// コード変換用の鍵ペア
    keys: CipherKeys,

    /// 生成ヘッダファイル
    code_file: CodeFile,

    /// バージョン問い合わせ手順
    version_query: Arc<VersionQuery>,

    /// ファームウェアビルド起動手順
    compile_launcher: Arc<CompileLauncher>,

    /// 成果物読み込み手順
    file_reader: Arc<FileReader>,

    /// 成果物書き込み手順
    file_writer: Arc<FileWriter>,

    /// 時刻取得手順
    clock: Arc<Clock>,
}

impl CompileCommandContext {
    ///
    /// オブジェクトの生成
    ///
    /// # 注記
    /// QMKツリーと出力先のディレクトリが設定されていない場合は、ファイル操作
    /// を行う前にエラーを返す。
    ///
    fn new(opts: &Options, sub_opts: &CompileOpts) -> Result<Self> {
        let (qmk_dir, output_dir) = match (opts.qmk_dir(), opts.output_dir()) {
            (Some(qmk_dir), Some(output_dir)) => (qmk_dir, output_dir),
            _ => return Err(anyhow!(DIR_NOT_SET)),
        };

        let (code1, code2) = sub_opts.codes();

        Ok(Self {
            code_file: CodeFile::new(&qmk_dir),
            qmk_dir,
            output_dir,
            request: BuildRequest {
                keyboard: sub_opts.keyboard(),
                keymap: sub_opts.keymap(),
                code1,
                code2,
                use_hash: sub_opts.use_hash(),
                suffix: sub_opts.suffix(),
            },
            keys: opts.cipher_keys(),
            version_query: default_version_query(),
            compile_launcher: default_compile_launcher(),
            file_reader: default_file_reader(),
            file_writer: default_file_writer(),
            clock: Arc::new(Local::now),
        })
    }

    ///
    /// ビルド成果物の出力先ディレクトリへの複製
    ///
    /// # 戻り値
    /// 複製に成功した場合は`Ok(())`を返す。読み込みと書き込みの失敗はそれぞれ
    /// 区別したエラー情報を`Err()`でラップして返す。
    ///
    fn copy_artifact(&self) -> Result<()> {
        let name = artifact_name(
            &self.request.keyboard,
            &self.request.keymap,
            self.request.suffix,
        );

        let src = self.qmk_dir.join(&name);
        let dst = self.output_dir.join(&name);

        let data = match (self.file_reader)(&src) {
            Ok(data) => data,
            Err(err) => {
                return Err(anyhow!("failed to read input file: {}", err));
            }
        };

        if let Err(err) = (self.file_writer)(&dst, &data) {
            return Err(anyhow!("failed to write to output file: {}", err));
        }

        info!("artifact copied: {}", dst.display());

        Ok(())
    }

    #[cfg(test)]
    ///
    /// テスト用に依存を差し替えたコンテキストを生成
    ///
    fn with_deps(
        qmk_dir: PathBuf,
        output_dir: PathBuf,
        request: BuildRequest,
        keys: CipherKeys,
        file_writer: Arc<FileWriter>,
        file_reader: Arc<FileReader>,
        version_query: Arc<VersionQuery>,
        compile_launcher: Arc<CompileLauncher>,
        clock: Arc<Clock>,
    ) -> Self {
        Self {
            code_file: CodeFile::with_writer(&qmk_dir, Arc::clone(&file_writer)),
            qmk_dir,
            output_dir,
            request,
            keys,
            version_query,
            compile_launcher,
            file_reader,
            file_writer,
            clock,
        }
    }
}

impl CommandContext for CompileCommandContext {
    fn exec(&self) -> Result<()> {
        /*
         * ビルド対象のバージョン識別子の取得
         */
        let version = (self.version_query)(&self.qmk_dir)?;
        let version: String = version.chars().take(VERSION_LEN).collect();

        debug!("version: {}", version);

        /*
         * ヘッダに埋め込むラベルの組み立て
         */
        let label = format!(
            "{} {}",
            (self.clock)().format("%Y-%m-%d %H:%M:%S"),
            version
        );

        /*
         * コードの変換(--hash指定時のみ)
         */
        let (code1, code2) = if self.request.use_hash {
            (
                rot(&self.request.code1, self.keys.key1(), true),
                rot(&self.request.code2, self.keys.key2(), true),
            )
        } else {
            (self.request.code1.clone(), self.request.code2.clone())
        };

        /*
         * コードを埋め込んだヘッダの書き込み。これ以降はガードのドロップに
         * よって待機状態への書き戻しが必ず実行される
         */
        let _guard = self.code_file.write_codes(&label, &code1, &code2)?;

        /*
         * ファームウェアビルドの実行
         */
        info!(
            "compile start: {} / {}",
            self.request.keyboard, self.request.keymap
        );

        if let Err(err) = (self.compile_launcher)(
            &self.qmk_dir,
            &self.request.keyboard,
            &self.request.keymap,
        ) {
            return Err(anyhow!("failed to run qmk compile: {}", err));
        }

        /*
         * 成果物の出力先への複製
         */
        if let Err(err) = self.copy_artifact() {
            return Err(anyhow!("failed to copy qmk files: {}", err));
        }

        Ok(())
    }
}

///
/// コマンドコンテキストの生成
///
pub(crate) fn build_context(
    opts: &Options,
    sub_opts: &CompileOpts,
) -> Result<Box<dyn CommandContext>> {
    Ok(Box::new(CompileCommandContext::new(opts, sub_opts)?))
}
