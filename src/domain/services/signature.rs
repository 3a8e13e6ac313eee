// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 签名密钥的原始字节长度（十六进制编码后为64个字符）
pub const SECRET_BYTES: usize = 32;

/// 生成新的随机签名密钥
///
/// # 返回值
///
/// 返回32字节随机数的小写十六进制编码
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// 为负载生成签名
///
/// 对传输的精确字节序列计算HMAC-SHA256。调用方必须传入与线上
/// 请求体完全一致的字节，接收方据此重算并比对。
///
/// # 参数
///
/// * `payload` - 负载字节
/// * `secret` - 签名密钥
///
/// # 返回值
///
/// 返回小写十六进制编码的签名
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// 校验负载签名
///
/// 重新计算签名并进行常数时间比较，避免计时侧信道。
///
/// # 参数
///
/// * `payload` - 负载字节
/// * `signature_hex` - 十六进制编码的待校验签名
/// * `secret` - 签名密钥
pub fn verify(payload: &[u8], signature_hex: &str, secret: &str) -> bool {
    let signature = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    // verify_slice is constant-time; never compare hex strings with ==
    mac.verify_slice(&signature).is_ok()
}
