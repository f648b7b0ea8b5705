/*
 * QMK build wrapper
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! 生成ヘッダとビルド成果物を取り扱うモジュール
//!

pub(crate) mod rot;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use anyhow::{anyhow, Result};
use log::error;
use regex::Regex;

/// QMKツリー内の生成ヘッダの相対パス
pub(crate) const CODE_FILE_PATH: &str = "users/kwgt/qmkw_codes.h";

/// 待機状態のヘッダに埋め込むバージョンラベル
const PLACEHOLDER_VERSION: &str = "auto-generated";

/// キーボード/キーマップ識別子中のパス区切り文字にマッチする正規表現
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/]").expect("regex compile failed"));

/// ファイル書き込み手順の型
pub(crate) type FileWriter = dyn Fn(&Path, &[u8]) -> io::Result<()> + Send + Sync;

/// ファイル読み込み手順の型
pub(crate) type FileReader = dyn Fn(&Path) -> io::Result<Vec<u8>> + Send + Sync;

///
/// デフォルトのファイル書き込み手順を生成する
///
pub(crate) fn default_file_writer() -> Arc<FileWriter> {
    Arc::new(|path: &Path, data: &[u8]| std::fs::write(path, data))
}

///
/// デフォルトのファイル読み込み手順を生成する
///
pub(crate) fn default_file_reader() -> Arc<FileReader> {
    Arc::new(|path: &Path| std::fs::read(path))
}

///
/// ビルド成果物の形式を表す列挙型
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArtifactSuffix {
    /// Intel HEX形式
    Hex,

    /// バイナリ形式
    Bin,
}

impl ArtifactSuffix {
    ///
    /// 拡張子文字列への変換
    ///
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Bin => "bin",
        }
    }
}

// Displayトレイトの実装
impl std::fmt::Display for ArtifactSuffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// ビルド成果物のファイル名の組み立て
///
/// # 引数
/// * `keyboard` - キーボード識別子
/// * `keymap` - キーマップ識別子
/// * `suffix` - 成果物の形式
///
/// # 戻り値
/// 成果物のファイル名を返す。
///
/// # 注記
/// 識別子に含まれるパス区切り文字(`/`および`\`)はアンダースコアに置き換え
/// る。
///
pub(crate) fn artifact_name(
    keyboard: &str,
    keymap: &str,
    suffix: ArtifactSuffix,
) -> String {
    format!(
        "{}_{}.{}",
        SEPARATOR_RE.replace_all(keyboard, "_"),
        SEPARATOR_RE.replace_all(keymap, "_"),
        suffix
    )
}

///
/// 生成ヘッダの内容の組み立て
///
/// # 引数
/// * `version` - ヘッダに埋め込むバージョンラベル
/// * `code1` - 埋め込むコード(1番目)
/// * `code2` - 埋め込むコード(2番目)
///
/// # 戻り値
/// ヘッダファイルの内容を返す。
///
/// # 注記
/// 各値は二重引用符で括ってそのまま埋め込む。値に二重引用符が含まれる場合の
/// エスケープは行わない。
///
pub(crate) fn render(version: &str, code1: &str, code2: &str) -> String {
    [
        "#pragma once".to_string(),
        format!("#define QMKW_VERSION \"{}\"", version),
        format!("#define QMKW_CODE_1 \"{}\"", code1),
        format!("#define QMKW_CODE_2 \"{}\"", code2),
        String::new(),
    ]
    .join("\n")
}

///
/// 生成ヘッダファイルを表す構造体
///
pub(crate) struct CodeFile {
    /// ヘッダファイルのパス
    path: PathBuf,

    /// ファイル書き込み手順
    writer: Arc<FileWriter>,
}

impl CodeFile {
    ///
    /// オブジェクトの生成
    ///
    /// # 引数
    /// * `qmk_dir` - QMKツリーのルートディレクトリ
    ///
    pub(crate) fn new(qmk_dir: &Path) -> Self {
        Self {
            path: qmk_dir.join(CODE_FILE_PATH),
            writer: default_file_writer(),
        }
    }

    #[cfg(test)]
    ///
    /// テスト用に書き込み手順を差し替えたオブジェクトの生成
    ///
    pub(crate) fn with_writer(qmk_dir: &Path, writer: Arc<FileWriter>) -> Self {
        Self {
            path: qmk_dir.join(CODE_FILE_PATH),
            writer,
        }
    }

    #[cfg(test)]
    ///
    /// ヘッダファイルのパスへのアクセサ
    ///
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    ///
    /// コードを埋め込んだヘッダの書き込み
    ///
    /// # 引数
    /// * `version` - ヘッダに埋め込むバージョンラベル
    /// * `code1` - 埋め込むコード(1番目)
    /// * `code2` - 埋め込むコード(2番目)
    ///
    /// # 戻り値
    /// 書き込みに成功した場合は、待機状態への書き戻しを担うガードオブジェクト
    /// を`Ok()`でラップして返す。失敗した場合はエラー情報を`Err()`でラップし
    /// て返す(この場合書き戻しは行われない)。
    ///
    pub(crate) fn write_codes(
        &self,
        version: &str,
        code1: &str,
        code2: &str,
    ) -> Result<RestoreGuard<'_>> {
        if let Err(err) = self.write(version, code1, code2) {
            return Err(anyhow!("failed to write code file: {}", err));
        }

        Ok(RestoreGuard { file: self })
    }

    ///
    /// ヘッダファイルの書き込み
    ///
    fn write(&self, version: &str, code1: &str, code2: &str) -> io::Result<()> {
        (self.writer)(&self.path, render(version, code1, code2).as_bytes())
    }
}

///
/// 生成ヘッダを待機状態へ書き戻すガードを表す構造体
///
/// # 注記
/// ドロップ時に書き戻しを一度だけ実行する。書き戻しに失敗した場合は標準エラー
/// とログへの記録のみを行い、パニックは発生させない。
///
pub(crate) struct RestoreGuard<'a> {
    /// 書き戻し対象のヘッダファイル
    file: &'a CodeFile,
}

// Dropトレイトの実装
impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.file.write(PLACEHOLDER_VERSION, "", "") {
            let line = critical_line(&err);

            error!("{}", line);
            eprintln!("{}", line);
        }
    }
}

///
/// 書き戻し失敗時の報告行の組み立て
///
fn critical_line(err: &io::Error) -> String {
    format!("CRITICAL: failed to remove temporary codes: {}", err)
}
