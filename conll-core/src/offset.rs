//! # Offsets de caractere ↔ byte
//!
//! O BRAT conta posições em **caracteres** (pontos de código), enquanto `&str`
//! em Rust só pode ser fatiado em **bytes**. Em texto clínico em espanhol a
//! diferença aparece logo na primeira vogal acentuada:
//!
//! ```text
//! "dolor en miocárdio"
//!  caractere: m=9 i=10 o=11 c=12 á=13 r=14 ...
//!  byte:      m=9 i=10 o=11 c=12 á=13..15 r=15 ...
//! ```
//!
//! Entidades e tokens ficam sempre em offsets de caractere; a conversão
//! acontece apenas nas bordas, quando é preciso fatiar o texto.

/// Conversor pré-calculado para um único texto.
///
/// Para texto ASCII as tabelas não são construídas (a conversão é identidade).
#[derive(Debug, Clone)]
pub struct SpanConverter {
    char_to_byte: Vec<usize>,
    byte_to_char: Vec<usize>,
    char_len: usize,
    is_ascii: bool,
}

impl SpanConverter {
    pub fn new(text: &str) -> Self {
        if text.is_ascii() {
            return Self {
                char_to_byte: Vec::new(),
                byte_to_char: Vec::new(),
                char_len: text.len(),
                is_ascii: true,
            };
        }

        let char_len = text.chars().count();
        let mut char_to_byte = Vec::with_capacity(char_len + 1);
        let mut byte_to_char = vec![0usize; text.len() + 1];
        for (char_idx, (byte_idx, ch)) in text.char_indices().enumerate() {
            char_to_byte.push(byte_idx);
            for b in byte_idx..byte_idx + ch.len_utf8() {
                byte_to_char[b] = char_idx;
            }
        }
        char_to_byte.push(text.len());
        byte_to_char[text.len()] = char_len;

        Self {
            char_to_byte,
            byte_to_char,
            char_len,
            is_ascii: false,
        }
    }

    /// Quantidade de caracteres do texto.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Offset de byte do caractere `char_idx` (satura no fim do texto).
    pub fn char_to_byte(&self, char_idx: usize) -> usize {
        if self.is_ascii {
            return char_idx.min(self.char_len);
        }
        self.char_to_byte
            .get(char_idx)
            .copied()
            .unwrap_or_else(|| self.char_to_byte.last().copied().unwrap_or(0))
    }

    /// Offset de caractere do byte `byte_idx` (satura no fim do texto).
    pub fn byte_to_char(&self, byte_idx: usize) -> usize {
        if self.is_ascii {
            return byte_idx.min(self.char_len);
        }
        self.byte_to_char
            .get(byte_idx)
            .copied()
            .unwrap_or(self.char_len)
    }

    /// Fatia `text` pelo intervalo de caracteres `[start, end)`.
    pub fn slice<'a>(&self, text: &'a str, start: usize, end: usize) -> &'a str {
        &text[self.char_to_byte(start)..self.char_to_byte(end)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_identity() {
        let conv = SpanConverter::new("dolor abdominal");
        assert_eq!(conv.char_to_byte(6), 6);
        assert_eq!(conv.byte_to_char(6), 6);
        assert_eq!(conv.char_len(), 15);
    }

    #[test]
    fn test_accented_text() {
        let text = "miocárdio agudo";
        let conv = SpanConverter::new(text);
        assert_eq!(conv.char_len(), 15);
        // "agudo" começa no caractere 10, byte 11
        assert_eq!(conv.char_to_byte(10), 11);
        assert_eq!(conv.byte_to_char(11), 10);
        assert_eq!(conv.slice(text, 0, 9), "miocárdio");
        assert_eq!(conv.slice(text, 10, 15), "agudo");
    }

    #[test]
    fn test_end_of_text_saturates() {
        let text = "ñu";
        let conv = SpanConverter::new(text);
        assert_eq!(conv.char_to_byte(2), 3);
        assert_eq!(conv.char_to_byte(99), 3);
        assert_eq!(conv.byte_to_char(3), 2);
    }
}
