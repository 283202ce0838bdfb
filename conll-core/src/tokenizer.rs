//! # Tokenizador para texto clínico em espanhol
//!
//! O tokenizador é tratado como um serviço externo pelo restante do pipeline:
//! dado um trecho de texto, devolve sentenças de tokens com offsets de **byte**
//! relativos ao trecho. Quem garante que nenhum token atravesse a borda de uma
//! entidade é o [`alignment`](crate::alignment), que chama o serviço uma vez
//! por região.
//!
//! ## Esquemas de Tokenização
//!
//! - **Standard**: palavras separadas por espaços e pontuação. Preserva
//!   abreviaturas clínicas comuns ("Dr.", "aprox.") e números decimais
//!   ("2.5", "0,5").
//! - **Unicode**: fronteiras de palavra e sentença do UAX #29
//!   (`unicode-segmentation`).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use conll_core::tokenizer::{Tokenizer, TokenizerMode};
//!
//! let tokenizer = TokenizerMode::Standard.build();
//! let sentences = tokenizer.tokenize("Dr. Pérez indica 2,5 mg. Control en 1 mes.");
//! assert_eq!(sentences.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Um token do documento, já em coordenadas absolutas.
///
/// É a unidade que vira uma linha do CoNLL. Diferente do [`TokenSpan`]
/// devolvido pelo serviço, `start` e `end` aqui são offsets de **caractere**,
/// o mesmo sistema de coordenadas das entidades do `.ann`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// Texto de saída (hífen no lugar de espaços internos, normalizações aplicadas).
    pub text: String,
    /// Offset de caractere inicial (inclusivo).
    pub start: usize,
    /// Offset de caractere final (exclusivo).
    pub end: usize,
    /// Posição do token no documento (0, 1, 2...).
    pub index: usize,
}

/// Um token devolvido pelo serviço: offsets de byte relativos ao trecho tokenizado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

/// Serviço de tokenização e segmentação em sentenças.
///
/// Implementações devem ser puras: a mesma entrada produz a mesma saída e
/// nenhuma chamada depende da anterior.
pub trait Tokenizer: Send + Sync {
    /// Divide `text` em sentenças de tokens (offsets de byte relativos a `text`).
    fn tokenize(&self, text: &str) -> Vec<Vec<TokenSpan>>;
}

/// Estratégias de tokenização disponíveis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    /// **Padrão**: separa por espaços e pontuação, mas preserva abreviaturas e decimais.
    Standard,
    /// **Unicode**: segmentação de palavras e sentenças do UAX #29.
    Unicode,
}

impl Default for TokenizerMode {
    fn default() -> Self {
        TokenizerMode::Standard
    }
}

impl TokenizerMode {
    /// Instancia o tokenizador correspondente ao modo.
    pub fn build(self) -> Box<dyn Tokenizer> {
        match self {
            TokenizerMode::Standard => Box::new(StandardTokenizer::new()),
            TokenizerMode::Unicode => Box::new(UnicodeTokenizer),
        }
    }
}

/// Abreviaturas comuns em notas clínicas que não encerram sentença.
const ABBREVIATIONS: &[&str] = &[
    "Dr", "Dra", "Sr", "Sra", "Srta", "Lic", "Prof", "Dpto", "Hosp", "Ud", "Uds",
    "aprox", "etc", "pág", "tel", "núm", "cap", "vol", "sig", "ej", "hrs", "hr",
    "mg", "ml", "mcg", "cc", "cm", "mm", "kg", "gr", "dl", "UI", "vs",
];

/// Pontuação que pode encerrar uma sentença.
const TERMINALS: &[&str] = &[".", "?", "!", "…"];

/// Tokenizador por regras, derivado de um scanner caractere a caractere.
#[derive(Debug, Clone)]
pub struct StandardTokenizer {
    abbreviations: Vec<String>,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardTokenizer {
    pub fn new() -> Self {
        Self {
            abbreviations: ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn is_abbreviation(&self, word: &str) -> bool {
        self.abbreviations.iter().any(|a| a == word)
    }

    /// Varre o texto e produz os tokens, ainda sem sentenças.
    fn scan(&self, text: &str) -> Vec<TokenSpan> {
        let mut tokens = Vec::new();
        let mut current_start = 0;
        let mut current = String::new();
        let chars: Vec<(usize, char)> = text.char_indices().collect();

        for (i, &(byte_pos, ch)) in chars.iter().enumerate() {
            let next = chars.get(i + 1).map(|(_, c)| *c);

            if ch.is_alphanumeric() || ((ch == '-' || ch == '/') && !current.is_empty()) {
                if current.is_empty() {
                    current_start = byte_pos;
                }
                current.push(ch);
            } else if (ch == '.' || ch == ',') && !current.is_empty() {
                // "2.5" e "0,5" continuam um único token
                let current_is_num = current.chars().all(|c| c.is_numeric());
                let next_is_num = next.map(|c| c.is_numeric()).unwrap_or(false);
                if current_is_num && next_is_num {
                    current.push(ch);
                } else if ch == '.' && self.is_abbreviation(&current) {
                    current.push('.');
                } else {
                    flush_token(&mut tokens, &mut current, current_start, byte_pos);
                    push_token(&mut tokens, byte_pos, byte_pos + 1);
                }
            } else if ch == '\'' || ch == '\u{2019}' {
                if current.is_empty() {
                    current_start = byte_pos;
                }
                current.push(ch);
            } else if ch.is_whitespace() {
                flush_token(&mut tokens, &mut current, current_start, byte_pos);
            } else {
                flush_token(&mut tokens, &mut current, current_start, byte_pos);
                push_token(&mut tokens, byte_pos, byte_pos + ch.len_utf8());
            }
        }
        flush_token(&mut tokens, &mut current, current_start, text.len());

        tokens
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Vec<TokenSpan>> {
        split_sentences(text, self.scan(text))
    }
}

/// Fecha a sentença após pontuação terminal seguida de espaço, ou em quebras de linha.
fn split_sentences(text: &str, tokens: Vec<TokenSpan>) -> Vec<Vec<TokenSpan>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        current.push(*token);
        let Some(next) = tokens.get(i + 1) else {
            break;
        };
        let gap = &text[token.end..next.start];
        let is_terminal = TERMINALS.contains(&&text[token.start..token.end]);
        if (is_terminal && !gap.is_empty()) || gap.contains('\n') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

/// Fecha o token acumulado e adiciona à lista (se não vazio)
fn flush_token(tokens: &mut Vec<TokenSpan>, current: &mut String, start: usize, end: usize) {
    if !current.is_empty() {
        tokens.push(TokenSpan { start, end });
        current.clear();
    }
}

/// Adiciona um token de pontuação diretamente
fn push_token(tokens: &mut Vec<TokenSpan>, start: usize, end: usize) {
    tokens.push(TokenSpan { start, end });
}

/// Tokenizador baseado nas fronteiras Unicode (UAX #29).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeTokenizer;

impl Tokenizer for UnicodeTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Vec<TokenSpan>> {
        text.split_sentence_bound_indices()
            .map(|(offset, sentence)| {
                sentence
                    .split_word_bound_indices()
                    .filter(|(_, word)| !word.trim().is_empty())
                    .map(|(start, word)| TokenSpan {
                        start: offset + start,
                        end: offset + start + word.len(),
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|sentence| !sentence.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(text: &'a str, sentences: &[Vec<TokenSpan>]) -> Vec<Vec<&'a str>> {
        sentences
            .iter()
            .map(|s| s.iter().map(|t| &text[t.start..t.end]).collect())
            .collect()
    }

    #[test]
    fn test_standard_basic() {
        let text = "Paciente con dolor abdominal.";
        let sentences = StandardTokenizer::new().tokenize(text);
        assert_eq!(
            texts(text, &sentences),
            vec![vec!["Paciente", "con", "dolor", "abdominal", "."]]
        );
    }

    #[test]
    fn test_standard_keeps_abbreviations_and_decimals() {
        let text = "Dr. Pérez: 2,5 mg/día (aprox. 3.5 ml)";
        let sentences = StandardTokenizer::new().tokenize(text);
        let words = texts(text, &sentences).concat();
        assert!(words.contains(&"Dr."));
        assert!(words.contains(&"2,5"));
        assert!(words.contains(&"mg/día"));
        assert!(words.contains(&"aprox."));
        assert!(words.contains(&"3.5"));
        assert!(words.contains(&"("));
    }

    #[test]
    fn test_standard_sentences() {
        let text = "Refiere fiebre. Niega tos\nControl en 1 mes";
        let sentences = StandardTokenizer::new().tokenize(text);
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn test_standard_multibyte_offsets() {
        let text = "úlcera gástrica";
        let sentences = StandardTokenizer::new().tokenize(text);
        assert_eq!(texts(text, &sentences), vec![vec!["úlcera", "gástrica"]]);
    }

    #[test]
    fn test_unicode_tokenizer() {
        let text = "Dolor torácico. Sin disnea.";
        let sentences = UnicodeTokenizer.tokenize(text);
        assert_eq!(
            texts(text, &sentences),
            vec![vec!["Dolor", "torácico", "."], vec!["Sin", "disnea", "."]]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(StandardTokenizer::new().tokenize("").is_empty());
        assert!(StandardTokenizer::new().tokenize("   \n").is_empty());
        assert!(UnicodeTokenizer.tokenize(" ").is_empty());
    }
}
