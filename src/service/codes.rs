use rand::Rng;

/// Alphabet for human-facing codes (tickets, employee sign-in). Leaves out
/// 0/O, 1/I/L so a code read over the phone or typed from a printout cannot
/// be misread.
pub(crate) const UNAMBIGUOUS_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub(crate) fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..UNAMBIGUOUS_ALPHABET.len());
            UNAMBIGUOUS_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_only_the_alphabet() {
        for _ in 0..50 {
            let code = random_code(8);
            assert_eq!(code.len(), 8);
            assert!(code.bytes().all(|b| UNAMBIGUOUS_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn alphabet_has_no_ambiguous_characters() {
        for forbidden in [b'0', b'O', b'1', b'I', b'L'] {
            assert!(!UNAMBIGUOUS_ALPHABET.contains(&forbidden));
        }
    }
}
