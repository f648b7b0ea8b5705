/*
 * QMK build wrapper
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! サブコマンドの処理を提供するモジュール
//!

pub(crate) mod compile;
pub(crate) mod config;
pub(crate) mod shell;

use anyhow::Result;

/// ディレクトリ未設定時のエラーメッセージ
pub(crate) const DIR_NOT_SET: &str =
    "directory values have not been set (`qmkw config set`)";

///
/// コマンドコンテキストを集約するトレイト
///
pub(crate) trait CommandContext {
    ///
    /// サブコマンドの実行
    ///
    fn exec(&self) -> Result<()>;
}
