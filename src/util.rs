#[inline]
pub(crate) fn push_u64_decimal(out: &mut Vec<u8>, mut n: u64) {
    if n == 0 {
        out.push(b'0');
        return;
    }

    let mut buf = [0u8; 20];
    let mut i = buf.len();
    while n > 0 {
        i -= 1;
        buf[i] = b'0' + ((n % 10) as u8);
        n /= 10;
    }
    out.extend_from_slice(&buf[i..]);
}

#[inline]
pub(crate) fn push_i64_decimal(out: &mut Vec<u8>, n: i64) {
    if n < 0 {
        out.push(b'-');
    }
    push_u64_decimal(out, n.unsigned_abs());
}

#[cfg(test)]
mod tests {
    use super::{push_i64_decimal, push_u64_decimal};

    #[test]
    fn push_u64_decimal_matches_formatter() {
        for n in [0_u64, 7, 10, 999_999_999, 1_431_993_516, u64::MAX] {
            let mut out = Vec::new();
            push_u64_decimal(&mut out, n);
            assert_eq!(out, n.to_string().into_bytes());
        }
    }

    #[test]
    fn push_i64_decimal_matches_formatter() {
        for n in [0_i64, -1, 42, -62_135_596_800, i64::MIN, i64::MAX] {
            let mut out = Vec::new();
            push_i64_decimal(&mut out, n);
            assert_eq!(out, n.to_string().into_bytes());
        }
    }
}
