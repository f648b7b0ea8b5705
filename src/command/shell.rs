/*
 * QMK build wrapper
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! 外部プロセスの起動手順をまとめたモジュール
//!

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::debug;

/// バージョン問い合わせ手順の型
pub(crate) type VersionQuery = dyn Fn(&Path) -> Result<String> + Send + Sync;

/// ファームウェアビルド起動手順の型
pub(crate) type CompileLauncher =
    dyn Fn(&Path, &str, &str) -> Result<()> + Send + Sync;

/// makeターゲット起動手順の型
pub(crate) type MakeLauncher = dyn Fn(&Path, &str) -> Result<()> + Send + Sync;

///
/// デフォルトのバージョン問い合わせ手順を生成する
///
/// # 戻り値
/// QMKツリーのHEADコミットのハッシュ値を問い合わせるクロージャを返す。
///
pub(crate) fn default_version_query() -> Arc<VersionQuery> {
    Arc::new(|qmk_dir: &Path| {
        let output = match Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(qmk_dir)
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                return Err(anyhow!("failed to run git rev-parse: {}", err));
            }
        };

        if !output.status.success() {
            return Err(anyhow!(
                "git rev-parse failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    })
}

///
/// デフォルトのファームウェアビルド起動手順を生成する
///
/// # 戻り値
/// QMKツリーのルートを作業ディレクトリとしてqmk compileを起動するクロージャ
/// を返す。
///
/// # 注記
/// qmkコマンドの標準出力は呼び出し元の端末へそのまま流し、標準エラー出力は
/// バッファへ取り込む。取り込んだ内容はビルドが失敗した場合のみ標準エラーへ
/// 再出力し、成功した場合はデバッグログにのみ残す。
///
pub(crate) fn default_compile_launcher() -> Arc<CompileLauncher> {
    Arc::new(|qmk_dir: &Path, keyboard: &str, keymap: &str| {
        let child = Command::new("qmk")
            .args(["compile", "--keyboard", keyboard, "--keymap", keymap])
            .current_dir(qmk_dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            if !stderr.is_empty() {
                eprint!("{}", stderr);
            }

            return Err(anyhow!("exited with {}", output.status));
        }

        if !stderr.is_empty() {
            debug!("qmk compile stderr: {}", stderr.trim_end());
        }

        Ok(())
    })
}

///
/// デフォルトのmakeターゲット起動手順を生成する
///
/// # 戻り値
/// QMKツリーのルートを作業ディレクトリとして指定のターゲットのmakeを起動す
/// るクロージャを返す。入出力はいずれも呼び出し元の端末をそのまま使用する。
///
pub(crate) fn default_make_launcher() -> Arc<MakeLauncher> {
    Arc::new(|qmk_dir: &Path, target: &str| {
        let status = match Command::new("make")
            .arg(target)
            .current_dir(qmk_dir)
            .status()
        {
            Ok(status) => status,
            Err(err) => {
                return Err(anyhow!("failed to run make {}: {}", target, err));
            }
        };

        if !status.success() {
            return Err(anyhow!("make {} exited with {}", target, status));
        }

        Ok(())
    })
}
