/*
 * QMK build wrapper
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! コード文字列の可逆変換処理の実装
//!

/// 変換対象となる文字の先頭(印字可能なASCII文字の最小値)
const MIN_RUNE: i32 = 32;

/// 変換対象となる文字の個数(0x20〜0x7eの95文字)
const RUNE_COUNT: i32 = 95;

///
/// 鍵文字列による位置依存のローテーション変換
///
/// # 引数
/// * `text` - 変換対象の文字列
/// * `key` - 変換に使用する鍵文字列
/// * `forward` - 順方向の変換を行う場合は`true`、逆方向の場合は`false`
///
/// # 戻り値
/// 変換後の文字列を返す。鍵が空文字列の場合は空文字列を返す。
///
/// # 注記
/// 印字可能なASCII文字(0x20〜0x7e)を対象とした95進の加算変換で、鍵がテキス
/// トより短い場合は鍵を繰り返して適用する。同じ鍵で順方向→逆方向の順に変換
/// すると元の文字列に戻る。範囲外の文字に対する検査は行わず、剰余で折り返し
/// た結果をそのまま返す。
///
pub(crate) fn rot(text: &str, key: &str, forward: bool) -> String {
    /*
     * 空鍵は縮退ケースとして空文字列に変換
     */
    if key.is_empty() {
        return String::new();
    }

    let keys = key.as_bytes();

    /*
     * 文字毎に鍵由来のオフセットを加算(逆方向の場合は減算)
     */
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            let nc = (c as i32) - MIN_RUNE;
            let nk = (keys[i % keys.len()] as i32) - MIN_RUNE;

            let nv = if forward {
                (nc + nk).rem_euclid(RUNE_COUNT)
            } else {
                (nc + RUNE_COUNT - nk).rem_euclid(RUNE_COUNT)
            };

            ((nv + MIN_RUNE) as u8) as char
        })
        .collect()
}

///
/// コード変換に使用する鍵のペアを保持する構造体
///
/// # 注記
/// 鍵の値はログおよびエラーメッセージに含めないこと。Debugの導出も行わない。
///
pub(crate) struct CipherKeys {
    /// コード1の変換に使用する鍵
    key1: String,

    /// コード2の変換に使用する鍵
    key2: String,
}

impl CipherKeys {
    ///
    /// オブジェクトの生成
    ///
    pub(crate) fn new(key1: impl Into<String>, key2: impl Into<String>) -> Self {
        Self {
            key1: key1.into(),
            key2: key2.into(),
        }
    }

    ///
    /// コード1用の鍵へのアクセサ
    ///
    pub(crate) fn key1(&self) -> &str {
        &self.key1
    }

    ///
    /// コード2用の鍵へのアクセサ
    ///
    pub(crate) fn key2(&self) -> &str {
        &self.key2
    }
}
