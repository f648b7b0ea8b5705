/*
 * QMK build wrapper
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! コマンドライン引数を取り扱うモジュール
//!

pub(crate) mod config;
mod logger;

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use directories::BaseDirs;

use crate::command::{compile, test, CommandContext};
use crate::qmk::rot::CipherKeys;
use crate::qmk::ArtifactSuffix;

/// コード1用の鍵を渡す環境変数名
const CODE_KEY1_ENV: &str = "QMKW_CODE_KEY1";

/// コード2用の鍵を渡す環境変数名
const CODE_KEY2_ENV: &str = "QMKW_CODE_KEY2";

/// 指定可能なログレベル名
const LOG_LEVELS: [&str; 6] =
    ["off", "error", "warn", "info", "debug", "trace"];

/// デフォルトのデータパス
static DEFAULT_DATA_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    BaseDirs::new()
        .unwrap()
        .data_local_dir()
        .join(env!("CARGO_PKG_NAME"))
        .to_path_buf()
});

///
/// デフォルトのコンフィグレーションファイルのパス情報を生成
///
/// # 戻り値
/// コンフィギュレーションファイルのパス情報
///
fn default_config_path() -> PathBuf {
    DEFAULT_DATA_PATH.join("config.toml")
}

///
/// デフォルトのログ出力先のパス情報を生成
///
/// # 戻り値
/// ログ出力先ディレクトリのパス情報
///
fn default_log_path() -> PathBuf {
    DEFAULT_DATA_PATH.join("logs")
}

///
/// グローバルオプション情報を格納する構造体
///
/// # 注記
/// サブコマンドのオプションに秘密情報を含み得るため、Debugの導出は行わない。
///
#[derive(Parser, Clone)]
#[command(
    name = "qmkw",
    about = "QMKファームウェアのビルドラッパー",
    version,
    long_about = None,
    subcommand_required = false,
    arg_required_else_help = true,
)]
pub struct Options {
    /// config.tomlを使用する場合のパス
    #[arg(short = 'c', long = "config")]
    config_path: Option<PathBuf>,

    /// QMKツリーのルートディレクトリ
    #[arg(long = "qmk-dir", value_name = "PATH")]
    qmk_dir: Option<PathBuf>,

    /// ビルド成果物の出力先ディレクトリ
    #[arg(long = "output-dir", value_name = "PATH")]
    output_dir: Option<PathBuf>,

    /// ログレベル(error/warn/info/debug/trace)
    #[arg(long = "log-level", default_value = "info", value_name = "LEVEL")]
    log_level: String,

    /// ログの出力先("-"を指定した場合は標準出力)
    #[arg(long = "log-output", value_name = "PATH")]
    log_output: Option<PathBuf>,

    /// 設定情報の表示
    #[arg(long = "show-options")]
    show_options: bool,

    /// 実行するサブコマンド
    #[command(subcommand)]
    command: Option<Command>,
}

impl Options {
    ///
    /// QMKツリーのルートディレクトリへのアクセサ
    ///
    /// # 戻り値
    /// オプションまたはコンフィギュレーションで指定されたパスを`Some()`でラッ
    /// プして返す。未設定の場合は`None`を返す。
    ///
    pub(crate) fn qmk_dir(&self) -> Option<PathBuf> {
        self.qmk_dir.clone()
    }

    ///
    /// ビルド成果物の出力先ディレクトリへのアクセサ
    ///
    /// # 戻り値
    /// オプションまたはコンフィギュレーションで指定されたパスを`Some()`でラッ
    /// プして返す。未設定の場合は`None`を返す。
    ///
    pub(crate) fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir.clone()
    }

    ///
    /// コンフィギュレーションファイルの保存先パスへのアクセサ
    ///
    /// # 戻り値
    /// オプションでパスが指定されている場合はそのパスを、未指定の場合はデフォ
    /// ルトのパスを返す。
    ///
    pub(crate) fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config_path {
            path.clone()
        } else {
            default_config_path()
        }
    }

    ///
    /// ログレベルへのアクセサ
    ///
    pub(crate) fn log_level(&self) -> String {
        self.log_level.clone()
    }

    ///
    /// ログ出力先へのアクセサ
    ///
    /// # 戻り値
    /// オプションで指定された出力先を返す。未指定の場合はデフォルトのログディ
    /// レクトリを返す。
    ///
    pub(crate) fn log_output(&self) -> PathBuf {
        if let Some(path) = &self.log_output {
            path.clone()
        } else {
            default_log_path()
        }
    }

    ///
    /// コード変換用の鍵ペアの取得
    ///
    /// # 戻り値
    /// 環境変数から読み取った鍵ペアを返す。未設定の環境変数は空文字列として扱
    /// う。
    ///
    /// # 注記
    /// 鍵はコンフィギュレーションファイルには保存せず、ログにも出力しないこ
    /// と。
    ///
    pub(crate) fn cipher_keys(&self) -> CipherKeys {
        CipherKeys::new(
            std::env::var(CODE_KEY1_ENV).unwrap_or_default(),
            std::env::var(CODE_KEY2_ENV).unwrap_or_default(),
        )
    }

    ///
    /// コンフィギュレーションファイルの適用
    ///
    /// # 戻り値
    /// 処理に成功した場合は`Ok(())`を返す。
    ///
    /// # 注記
    /// config.tomlを読み込みオプション情報に反映する。オプションで明示された
    /// 値が優先される。
    ///
    fn apply_config(&mut self) -> Result<()> {
        let path = if let Some(path) = &self.config_path {
            // オプションでコンフィギュレーションファイルのパスが指定されて
            // いる場合、そのパスに何もなければエラー
            if !path.exists() {
                return Err(anyhow!("{} is not exists", path.display()));
            }

            // 指定されたパスを返す
            path.clone()

        } else {
            default_config_path()
        };

        // この時点でパスに何も無い場合はそのまま何もせず正常終了
        if !path.exists() {
            return Ok(());
        }

        // 指定されたパスにあるのがファイルでなければエラー
        if !path.is_file() {
            return Err(anyhow!("{} is not file", path.display()));
        }

        // そのパスからコンフィギュレーションを読み取る
        match config::load(&path) {
            // コンフィギュレーションファイルを読み取れた場合は内容をオプション
            // 情報に反映する。
            Ok(config) => {
                if self.qmk_dir.is_none() {
                    if let Some(path) = &config.qmk_dir() {
                        self.qmk_dir = Some(path.clone());
                    }
                }

                if self.output_dir.is_none() {
                    if let Some(path) = &config.output_dir() {
                        self.output_dir = Some(path.clone());
                    }
                }

                Ok(())
            }

            // エラーが出たらそのままエラー
            Err(err) => Err(anyhow!("{}", err)),
        }
    }

    ///
    /// オプション情報のバリデート
    ///
    /// # 戻り値
    /// オプション情報に矛盾が無い場合は`Ok(())`を返す。
    ///
    fn validate(&mut self) -> Result<()> {
        /*
         * ログレベル名の検査
         */
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(anyhow!("invalid log level: {}", self.log_level));
        }

        Ok(())
    }

    ///
    /// オプション設定内容の表示
    ///
    fn show_options(&self) {
        let config_path = if let Some(path) = &self.config_path {
            path.display().to_string()
        } else {
            let path = default_config_path();

            if path.exists() {
                path.display().to_string()
            } else {
                "(none)".to_string()
            }
        };

        let qmk_dir = if let Some(path) = &self.qmk_dir {
            path.display().to_string()
        } else {
            "(none)".to_string()
        };

        let output_dir = if let Some(path) = &self.output_dir {
            path.display().to_string()
        } else {
            "(none)".to_string()
        };

        println!("global options");
        println!("   config path: {}", config_path);
        println!("   qmk dir:     {}", qmk_dir);
        println!("   output dir:  {}", output_dir);
        println!("   log level:   {}", self.log_level());
        println!("   log output:  {}", self.log_output().display());

        // サブコマンドが指定されており、そのサブコマンドがオプションを持つなら
        // そのオプションも表示する。
        if let Some(command) = &self.command {
            let opts: Option<&dyn ShowOptions> = match command {
                Command::Compile(opts) => Some(opts),
                Command::Config(opts) => Some(opts),
                _ => None,
            };

            if let Some(opts) = opts {
                println!("");
                opts.show_options();
            }
        }
    }

    ///
    /// サブコマンドのコマンドコンテキストの生成
    ///
    pub(crate) fn build_context(&self) -> Result<Box<dyn CommandContext>> {
        match &self.command {
            Some(Command::Compile(opts)) => compile::build_context(self, opts),
            Some(Command::Config(opts)) => {
                crate::command::config::build_context(self, opts)
            }
            Some(Command::Test) => test::build_context(self),
            None => Err(anyhow!("command not specified")),
        }
    }

    #[cfg(test)]
    ///
    /// テスト用のコンストラクタ
    ///
    pub(crate) fn new_for_test(
        qmk_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            config_path: None,
            qmk_dir,
            output_dir,
            log_level: "info".to_string(),
            log_output: None,
            show_options: false,
            command: None,
        }
    }
}

///
/// サブコマンドの定義
///
#[derive(Clone, Subcommand)]
enum Command {
    /// ファームウェアのビルド
    #[command(alias = "c")]
    Compile(CompileOpts),

    /// 設定値の表示と保存
    Config(ConfigOpts),

    /// QMKツリー上のテストターゲットの実行
    #[command(alias = "t")]
    Test,
}

///
/// show_options()実装を要求するトレイト
///
trait ShowOptions {
    ///
    /// オプション設定内容の表示
    ///
    fn show_options(&self);
}

///
/// サブコマンドcompileのオプション
///
/// # 注記
/// コードは秘密情報を含み得るため、Debugの導出およびshow_options()での表示は
/// 行わない。
///
#[derive(Clone, Args)]
pub(crate) struct CompileOpts {
    /// ヘッダに埋め込むコードのペア
    #[arg(short = 'c', long = "codes", num_args = 2, value_name = "CODE")]
    codes: Vec<String>,

    /// コードを鍵で変換してから埋め込むか否かを表すフラグ
    #[arg(long = "hash")]
    hash: bool,

    /// 成果物をhex形式とするか否かを表すフラグ
    #[arg(short = 'x', long = "hex-file")]
    hex_file: bool,

    /// ビルド対象のキーボード識別子
    #[arg(value_name = "KEYBOARD")]
    keyboard: String,

    /// ビルド対象のキーマップ識別子
    #[arg(value_name = "KEYMAP")]
    keymap: String,
}

impl CompileOpts {
    ///
    /// キーボード識別子へのアクセサ
    ///
    pub(crate) fn keyboard(&self) -> String {
        self.keyboard.clone()
    }

    ///
    /// キーマップ識別子へのアクセサ
    ///
    pub(crate) fn keymap(&self) -> String {
        self.keymap.clone()
    }

    ///
    /// ヘッダに埋め込むコードのペアへのアクセサ
    ///
    /// # 戻り値
    /// コードのペアを返す。オプションで未指定の場合は空文字列のペアを返す。
    ///
    pub(crate) fn codes(&self) -> (String, String) {
        let mut codes = self.codes.iter().cloned();

        (
            codes.next().unwrap_or_default(),
            codes.next().unwrap_or_default(),
        )
    }

    ///
    /// コードを変換してから埋め込むか否かのフラグへのアクセサ
    ///
    pub(crate) fn use_hash(&self) -> bool {
        self.hash
    }

    ///
    /// ビルド成果物の形式の取得
    ///
    pub(crate) fn suffix(&self) -> ArtifactSuffix {
        if self.hex_file {
            ArtifactSuffix::Hex
        } else {
            ArtifactSuffix::Bin
        }
    }

    #[cfg(test)]
    ///
    /// テスト用のコンストラクタ
    ///
    pub(crate) fn new_for_test(
        keyboard: impl Into<String>,
        keymap: impl Into<String>,
        codes: Vec<String>,
        hash: bool,
        hex_file: bool,
    ) -> Self {
        Self {
            codes,
            hash,
            hex_file,
            keyboard: keyboard.into(),
            keymap: keymap.into(),
        }
    }
}

// ShowOptionsトレイトの実装
impl ShowOptions for CompileOpts {
    fn show_options(&self) {
        println!("compile command options");
        println!("   keyboard:  {}", self.keyboard());
        println!("   keymap:    {}", self.keymap());
        println!("   use hash:  {}", self.use_hash());
        println!("   suffix:    {}", self.suffix());
    }
}

///
/// サブコマンドconfigのオプション
///
#[derive(Clone, Args, Debug)]
pub(crate) struct ConfigOpts {
    /// 実行する操作
    #[command(subcommand)]
    command: ConfigCommand,
}

impl ConfigOpts {
    ///
    /// 指定された操作へのアクセサ
    ///
    pub(crate) fn command(&self) -> ConfigCommand {
        self.command.clone()
    }
}

// ShowOptionsトレイトの実装
impl ShowOptions for ConfigOpts {
    fn show_options(&self) {
        println!("config command options");

        match &self.command {
            ConfigCommand::List => {
                println!("   action:  list");
            }

            ConfigCommand::Set(opts) => {
                println!("   action:      set");
                println!("   qmk dir:     {}", opts.qmk_dir().display());
                println!("   output dir:  {}", opts.output_dir().display());
            }
        }
    }
}

///
/// サブコマンドconfigの操作の定義
///
#[derive(Clone, Debug, Subcommand)]
pub(crate) enum ConfigCommand {
    /// 設定値の一覧表示
    List,

    /// 設定値の保存
    Set(ConfigSetOpts),
}

///
/// config setのオプション
///
#[derive(Clone, Args, Debug)]
pub(crate) struct ConfigSetOpts {
    /// QMKツリーのルートディレクトリ
    #[arg(value_name = "QMK_DIR")]
    qmk_dir: PathBuf,

    /// ビルド成果物の出力先ディレクトリ
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,
}

impl ConfigSetOpts {
    ///
    /// QMKツリーのルートディレクトリへのアクセサ
    ///
    pub(crate) fn qmk_dir(&self) -> PathBuf {
        self.qmk_dir.clone()
    }

    ///
    /// 出力先ディレクトリへのアクセサ
    ///
    pub(crate) fn output_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }

    #[cfg(test)]
    ///
    /// テスト用のコンストラクタ
    ///
    pub(crate) fn new_for_test(qmk_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            qmk_dir,
            output_dir,
        }
    }
}

///
/// コマンドライン引数のパース処理
///
/// # 戻り値
/// オプション情報をまとめたオブジェクトを返す。
///
pub(crate) fn parse() -> Result<Arc<Options>> {
    let mut opts = Options::parse();

    /*
     * デフォルトデータパスの作成
     */
    std::fs::create_dir_all(DEFAULT_DATA_PATH.clone())?;

    /*
     * コンフィギュレーションファイルの適用
     */
    opts.apply_config()?;

    /*
     * 設定情報のバリデーション
     */
    opts.validate()?;

    /*
     * ロガーの初期化
     */
    logger::init(&opts)?;

    /*
     * 設定情報の表示
     */
    if opts.show_options {
        opts.show_options();
        std::process::exit(0);
    }

    /*
     * 設定情報の返却
     */
    Ok(Arc::new(opts))
}

#[cfg(test)]
mod tests {
    use super::*;

    ///
    /// compileサブコマンドのオプションが正しくパースされることを確認
    ///
    #[test]
    fn parse_compile_options() {
        let opts = Options::try_parse_from([
            "qmkw", "compile", "kb", "km", "-c", "aaa", "bbb", "--hash", "-x",
        ])
        .unwrap();

        match opts.command {
            Some(Command::Compile(sub)) => {
                assert_eq!(sub.keyboard(), "kb");
                assert_eq!(sub.keymap(), "km");
                assert_eq!(sub.codes(), ("aaa".to_string(), "bbb".to_string()));
                assert!(sub.use_hash());
                assert_eq!(sub.suffix(), ArtifactSuffix::Hex);
            }

            _ => panic!("unexpected command"),
        }
    }

    ///
    /// compileサブコマンドの省略可能なオプションのデフォルト値を確認
    ///
    #[test]
    fn parse_compile_defaults() {
        let opts = Options::try_parse_from(["qmkw", "c", "kb", "km"]).unwrap();

        match opts.command {
            Some(Command::Compile(sub)) => {
                assert_eq!(sub.codes(), (String::new(), String::new()));
                assert!(!sub.use_hash());
                assert_eq!(sub.suffix(), ArtifactSuffix::Bin);
            }

            _ => panic!("unexpected command"),
        }
    }

    ///
    /// config setサブコマンドのオプションが正しくパースされることを確認
    ///
    #[test]
    fn parse_config_set() {
        let opts =
            Options::try_parse_from(["qmkw", "config", "set", "/a", "/b"])
                .unwrap();

        match opts.command {
            Some(Command::Config(sub)) => match sub.command() {
                ConfigCommand::Set(set) => {
                    assert_eq!(set.qmk_dir(), PathBuf::from("/a"));
                    assert_eq!(set.output_dir(), PathBuf::from("/b"));
                }

                _ => panic!("unexpected config command"),
            },

            _ => panic!("unexpected command"),
        }
    }

    ///
    /// 必須の位置引数が欠けている場合はパースエラーとなることを確認
    ///
    #[test]
    fn parse_rejects_missing_positional() {
        assert!(Options::try_parse_from(["qmkw", "compile", "kb"]).is_err());
    }

    ///
    /// 不正なログレベル名がバリデーションで弾かれることを確認
    ///
    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut opts = Options::new_for_test(None, None);

        opts.log_level = "verbose".to_string();
        assert!(opts.validate().is_err());

        opts.log_level = "DEBUG".to_string();
        assert!(opts.validate().is_ok());
    }
}
