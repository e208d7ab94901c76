use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

const SUFFIX_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 6;

static ORDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// 生成订单号：`ORD` + UTC 时间 `YYYYMMDDHHMMSS` + 4位序号 + 6位随机字母数字
///
/// 同一秒内由进程内序号区分，跨进程由随机后缀区分，最终由唯一索引兜底。
pub fn generate_order_no() -> String {
    generate_order_no_at(Utc::now())
}

pub fn generate_order_no_at(now: DateTime<Utc>) -> String {
    let seq = ORDER_SEQ.fetch_add(1, Ordering::Relaxed) % 10_000;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
        .collect();

    format!("ORD{}{:04}{}", now.format("%Y%m%d%H%M%S"), seq, suffix)
}
