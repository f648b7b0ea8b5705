/*
 * QMK build wrapper
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! configサブコマンドの実装
//!

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::cmd_args::{config::Config, ConfigCommand, ConfigOpts, Options};
use super::CommandContext;

///
/// configサブコマンドのコンテキスト情報をパックした構造体
///
struct ConfigCommandContext {
    /// 実行する操作
    command: ConfigCommand,

    /// コンフィギュレーションファイルの保存先
    config_path: PathBuf,

    /// 現在のQMKツリーのルートディレクトリ
    qmk_dir: Option<PathBuf>,

    /// 現在の成果物出力先ディレクトリ
    output_dir: Option<PathBuf>,
}

impl ConfigCommandContext {
    ///
    /// オブジェクトの生成
    ///
    fn new(opts: &Options, sub_opts: &ConfigOpts) -> Self {
        Self {
            command: sub_opts.command(),
            config_path: opts.config_path(),
            qmk_dir: opts.qmk_dir(),
            output_dir: opts.output_dir(),
        }
    }

    ///
    /// 設定値の一覧表示
    ///
    fn exec_list(&self) -> Result<()> {
        let qmk_dir = self
            .qmk_dir
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());

        let output_dir = self
            .output_dir
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());

        println!("QMK Directory:    {}", qmk_dir);
        println!("Output Directory: {}", output_dir);

        Ok(())
    }

    ///
    /// 設定値の保存
    ///
    /// # 引数
    /// * `qmk_dir` - QMKツリーのルートディレクトリ
    /// * `output_dir` - 成果物の出力先ディレクトリ
    ///
    /// # 戻り値
    /// 保存に成功した場合は`Ok(())`を返す。
    ///
    /// # 注記
    /// 指定されたディレクトリの存在を確認した上で、正規化したパスを設定ファ
    /// イルへ保存する。
    ///
    fn exec_set(&self, qmk_dir: &Path, output_dir: &Path) -> Result<()> {
        let qmk_dir = canonical_dir(qmk_dir)?;
        let output_dir = canonical_dir(output_dir)?;

        Config::with_dirs(qmk_dir, output_dir).save(&self.config_path)?;
        println!("write config to {}", self.config_path.display());

        Ok(())
    }
}

impl CommandContext for ConfigCommandContext {
    fn exec(&self) -> Result<()> {
        match &self.command {
            ConfigCommand::List => self.exec_list(),
            ConfigCommand::Set(opts) => {
                self.exec_set(&opts.qmk_dir(), &opts.output_dir())
            }
        }
    }
}

///
/// ディレクトリパスの検証と正規化
///
/// # 戻り値
/// 正規化済みのパスを返す。パスがディレクトリとして存在しない場合はエラー情
/// 報を`Err()`でラップして返す。
///
fn canonical_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(anyhow!("{} is not directory", path.display()));
    }

    match std::fs::canonicalize(path) {
        Ok(path) => Ok(path),
        Err(err) => {
            Err(anyhow!("failed to resolve {}: {}", path.display(), err))
        }
    }
}

///
/// コマンドコンテキストの生成
///
pub(crate) fn build_context(
    opts: &Options,
    sub_opts: &ConfigOpts,
) -> Result<Box<dyn CommandContext>> {
    Ok(Box::new(ConfigCommandContext::new(opts, sub_opts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_args::{config, ConfigSetOpts};

    ///
    /// setで指定したディレクトリが正規化されてconfig.tomlへ保存されることを
    /// 確認
    ///
    #[test]
    fn set_persists_canonical_directories() {
        let dir = tempfile::tempdir().unwrap();
        let qmk_dir = dir.path().join("qmk_firmware");
        let output_dir = dir.path().join("out");

        std::fs::create_dir_all(&qmk_dir).unwrap();
        std::fs::create_dir_all(&output_dir).unwrap();

        let config_path = dir.path().join("config.toml");

        let ctx = ConfigCommandContext {
            command: ConfigCommand::Set(ConfigSetOpts::new_for_test(
                qmk_dir.clone(),
                output_dir.clone(),
            )),
            config_path: config_path.clone(),
            qmk_dir: None,
            output_dir: None,
        };

        ctx.exec().unwrap();

        let config = config::load(&config_path).unwrap();

        assert_eq!(
            config.qmk_dir(),
            Some(std::fs::canonicalize(&qmk_dir).unwrap())
        );
        assert_eq!(
            config.output_dir(),
            Some(std::fs::canonicalize(&output_dir).unwrap())
        );
    }

    ///
    /// 存在しないディレクトリを指定した場合はエラーとなり、設定ファイルが作
    /// 成されないことを確認
    ///
    #[test]
    fn set_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");

        std::fs::create_dir_all(&output_dir).unwrap();

        let config_path = dir.path().join("config.toml");

        let ctx = ConfigCommandContext {
            command: ConfigCommand::Set(ConfigSetOpts::new_for_test(
                dir.path().join("missing"),
                output_dir,
            )),
            config_path: config_path.clone(),
            qmk_dir: None,
            output_dir: None,
        };

        assert!(ctx.exec().is_err());
        assert!(!config_path.exists());
    }

    ///
    /// ディレクトリではないパスを指定した場合はエラーになることを確認
    ///
    #[test]
    fn set_rejects_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not_a_dir");

        std::fs::write(&file_path, b"x").unwrap();

        let result = canonical_dir(&file_path);

        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("is not directory"));
    }
}
