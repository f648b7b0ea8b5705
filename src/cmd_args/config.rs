/*
 * QMK build wrapper
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! コンフィギュレーション情報の定義
//!

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

///
/// コンフィギュレーションデータを集約する構造体
///
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct Config {
    global: Option<GlobalInfo>,
}

impl Config {
    ///
    /// ディレクトリ設定からコンフィギュレーション情報を生成
    ///
    /// # 引数
    /// * `qmk_dir` - QMKツリーのルートディレクトリ
    /// * `output_dir` - ビルド成果物の出力先ディレクトリ
    ///
    /// # 戻り値
    /// 指定されたディレクトリを設定したコンフィギュレーション情報を返す。
    ///
    pub(crate) fn with_dirs(qmk_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            global: Some(GlobalInfo {
                qmk_dir: Some(qmk_dir),
                output_dir: Some(output_dir),
            })
        }
    }

    ///
    /// QMKツリーのルートディレクトリへのアクセサ
    ///
    /// # 戻り値
    /// ディレクトリが設定されている場合はパス情報を`Some()`でラップして返す。
    ///
    pub(crate) fn qmk_dir(&self) -> Option<PathBuf> {
        self.global
            .as_ref()
            .and_then(|global| global.qmk_dir.as_ref())
            .cloned()
    }

    ///
    /// ビルド成果物の出力先ディレクトリへのアクセサ
    ///
    /// # 戻り値
    /// ディレクトリが設定されている場合はパス情報を`Some()`でラップして返す。
    ///
    pub(crate) fn output_dir(&self) -> Option<PathBuf> {
        self.global
            .as_ref()
            .and_then(|global| global.output_dir.as_ref())
            .cloned()
    }

    ///
    /// コンフィギュレーション情報の保存
    ///
    /// # 戻り値
    /// 保存に成功した場合は`Ok(())`を返す。失敗した場合はエラー情報を`Err()`で
    /// ラップして返す。
    ///
    pub(crate) fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>
    {
        if let Err(err) = std::fs::write(path, &toml::to_string(self)?) {
            Err(anyhow!("write config error: {}", err))
        } else {
            Ok(())
        }
    }
}

///
/// グローバル設定を格納する構造体
///
#[derive(Debug, Deserialize, Serialize)]
struct GlobalInfo {
    /// QMKツリーのルートディレクトリ
    qmk_dir: Option<PathBuf>,

    /// ビルド成果物の出力先ディレクトリ
    output_dir: Option<PathBuf>,
}

///
/// コンフィギュレーション情報の読み込み
///
pub(crate) fn load<P>(path: P) -> Result<Config>
where
    P: AsRef<Path>
{
    Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
}
