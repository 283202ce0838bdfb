//! # Tokenização que preserva as bordas das entidades
//!
//! Tokenizar o documento inteiro de uma vez pode produzir tokens que começam
//! fora de uma entidade e terminam dentro dela (ex: anotação `[12, 17)` sobre
//! "dolor" em "condolor"). Para que isso nunca aconteça, o texto é particionado
//! em **regiões** e o serviço de tokenização é chamado em cada uma isoladamente:
//!
//! ```text
//! "Paciente con dolor abdominal."
//!  [ gap       ][ entidade     ][gap]
//!  0          12              28  29
//! ```
//!
//! Os offsets devolvidos pelo serviço são relativos à região; somamos o início
//! da região e convertemos para caracteres. Depois, os tokens de todas as
//! regiões são reordenados por `start`.
//!
//! Perto das bordas a tokenização pode diferir da de uma passada única sobre o
//! documento. Isso é aceito: a garantia de alinhamento vale mais.

use serde::{Deserialize, Serialize};

use crate::annotation::EntitySpan;
use crate::offset::SpanConverter;
use crate::tokenizer::{Token, Tokenizer};

/// Sequência de tokens tratada como uma unidade de sentença.
pub type Sentence = Vec<Token>;

/// Normalizações opcionais aplicadas ao texto do token depois da tokenização.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Converte o texto do token para minúsculas.
    pub lowercase: bool,
    /// Remove o acento agudo das cinco vogais (á é í ó ú).
    pub strip_accents: bool,
}

/// Tipo de região do particionamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Trecho coberto por pelo menos uma entidade.
    Entity,
    /// Trecho entre entidades (ou antes da primeira / depois da última).
    Gap,
}

/// Um intervalo de caracteres tokenizado de forma independente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub end: usize,
    pub kind: RegionKind,
}

/// Particiona `[0, char_len)` nas bordas das entidades.
///
/// O texto é cortado em toda borda de toda entidade. Para entidades disjuntas
/// isso equivale a "uma região por entidade mais as lacunas"; para entidades
/// que se cruzam (permitidas no conjunto flat) garante que nenhuma região
/// atravesse borda alguma. Regiões vazias não são geradas.
pub fn regions(char_len: usize, entities: &[EntitySpan]) -> Vec<Region> {
    let mut bounds: Vec<usize> = Vec::with_capacity(entities.len() * 2 + 2);
    bounds.push(0);
    bounds.push(char_len);
    for entity in entities {
        bounds.push(entity.start.min(char_len));
        bounds.push(entity.end.min(char_len));
    }
    bounds.sort_unstable();
    bounds.dedup();

    bounds
        .windows(2)
        .map(|w| {
            let (start, end) = (w[0], w[1]);
            let covered = entities.iter().any(|e| e.start <= start && end <= e.end);
            Region {
                start,
                end,
                kind: if covered { RegionKind::Entity } else { RegionKind::Gap },
            }
        })
        .collect()
}

/// Tokeniza o documento sem deixar nenhum token atravessar uma entidade.
///
/// Devolve uma única unidade de sentença com todos os tokens do documento em
/// ordem (possivelmente vazia): regiões geradas por chamadas separadas não
/// carregam fronteiras de sentença confiáveis depois de reintercaladas.
pub fn tokenize_aligned(
    text: &str,
    entities: &[EntitySpan],
    tokenizer: &dyn Tokenizer,
    options: &TextOptions,
) -> Vec<Sentence> {
    let conv = SpanConverter::new(text);
    let mut tokens = Vec::new();

    for region in regions(conv.char_len(), entities) {
        let byte_start = conv.char_to_byte(region.start);
        let byte_end = conv.char_to_byte(region.end);
        let chunk = &text[byte_start..byte_end];

        for span in tokenizer.tokenize(chunk).into_iter().flatten() {
            let Some(raw) = chunk.get(span.start..span.end) else {
                tracing::warn!(
                    start = span.start,
                    end = span.end,
                    "token fora dos limites da região ignorado"
                );
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }
            tokens.push(Token {
                text: normalize_token(raw, options),
                start: conv.byte_to_char(byte_start + span.start),
                end: conv.byte_to_char(byte_start + span.end),
                index: 0,
            });
        }
    }

    tokens.sort_by_key(|t| t.start);
    for (i, token) in tokens.iter_mut().enumerate() {
        token.index = i;
    }
    vec![tokens]
}

/// Texto de saída do token: uma linha por token, normalizações opcionais.
pub fn normalize_token(raw: &str, options: &TextOptions) -> String {
    let mut text: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    if options.lowercase {
        text = text.to_lowercase();
    }
    if options.strip_accents {
        text = strip_accents(&text);
    }
    text
}

/// Troca as vogais com acento agudo pelas vogais simples.
pub fn strip_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' => 'U',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::parse_entities;
    use crate::reconcile::flat_entities;
    use crate::tokenizer::{StandardTokenizer, TokenSpan, TokenizerMode};

    fn token_texts(sentences: &[Sentence]) -> Vec<&str> {
        sentences.iter().flatten().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_regions_cover_text() {
        let entities = parse_entities("T1 Finding 12 28 dolor abdominal").unwrap();
        let regions = regions(29, &entities);
        assert_eq!(
            regions,
            vec![
                Region { start: 0, end: 12, kind: RegionKind::Gap },
                Region { start: 12, end: 28, kind: RegionKind::Entity },
                Region { start: 28, end: 29, kind: RegionKind::Gap },
            ]
        );
    }

    #[test]
    fn test_regions_adjacent_entities_have_no_empty_gap() {
        let entities = parse_entities("T1 Finding 0 5 a\nT2 Disease 5 9 b").unwrap();
        let regions = regions(9, &entities);
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(|r| r.kind == RegionKind::Entity));
    }

    #[test]
    fn test_regions_split_crossing_entities() {
        let entities = parse_entities("T1 Finding 0 10 a\nT2 Disease 5 15 b").unwrap();
        let bounds: Vec<(usize, usize)> = regions(20, &entities).iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(bounds, vec![(0, 5), (5, 10), (10, 15), (15, 20)]);
    }

    #[test]
    fn test_scenario_tokens() {
        let text = "Paciente con dolor abdominal.";
        let entities = flat_entities(&parse_entities("T1 Clinical_Finding 12 28 dolor abdominal").unwrap());
        let sentences = tokenize_aligned(text, &entities, &StandardTokenizer::new(), &TextOptions::default());
        assert_eq!(sentences.len(), 1);
        assert_eq!(token_texts(&sentences), vec!["Paciente", "con", "dolor", "abdominal", "."]);
        let dolor = &sentences[0][2];
        assert_eq!((dolor.start, dolor.end, dolor.index), (13, 18, 2));
    }

    #[test]
    fn test_mid_word_entity_splits_token() {
        // "hipertensión" anotada só em "tensión"
        let text = "Tiene hipertensión.";
        let entities = parse_entities("T1 Disease 11 18 tensión").unwrap();
        let sentences = tokenize_aligned(text, &entities, &StandardTokenizer::new(), &TextOptions::default());
        assert_eq!(token_texts(&sentences), vec!["Tiene", "hiper", "tensión", "."]);
        for token in &sentences[0] {
            let e = &entities[0];
            let partial = token.start < e.end && e.start < token.end && !(e.start <= token.start && token.end <= e.end);
            assert!(!partial, "token {:?} atravessa a entidade", token);
        }
    }

    #[test]
    fn test_round_trip_modulo_whitespace() {
        let text = "Dolor  torácico\nirradiado a brazo izquierdo. Sin disnea.";
        let entities = flat_entities(
            &parse_entities("T1 Finding 0 15 Dolor torácico\nT2 Body_Part 28 43 brazo izquierdo").unwrap(),
        );
        for mode in [TokenizerMode::Standard, TokenizerMode::Unicode] {
            let tokenizer = mode.build();
            let sentences = tokenize_aligned(text, &entities, tokenizer.as_ref(), &TextOptions::default());
            let rebuilt: String = token_texts(&sentences).concat();
            let expected: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            assert_eq!(rebuilt, expected);
        }
    }

    #[test]
    fn test_normalization_options() {
        let opts = TextOptions { lowercase: true, strip_accents: true };
        assert_eq!(normalize_token("Úlcera", &opts), "ulcera");
        let only_accents = TextOptions { lowercase: false, strip_accents: true };
        assert_eq!(normalize_token("Péptica", &only_accents), "Peptica");
        assert_eq!(normalize_token("ñandú", &TextOptions::default()), "ñandú");
    }

    struct MultiWord;

    impl Tokenizer for MultiWord {
        fn tokenize(&self, text: &str) -> Vec<Vec<TokenSpan>> {
            vec![vec![TokenSpan { start: 0, end: text.len() }]]
        }
    }

    #[test]
    fn test_multiword_token_gets_hyphen() {
        let text = "San Juan de Dios";
        let sentences = tokenize_aligned(text, &[], &MultiWord, &TextOptions::default());
        assert_eq!(token_texts(&sentences), vec!["San-Juan-de-Dios"]);
    }

    #[test]
    fn test_empty_document_yields_one_empty_sentence() {
        let sentences = tokenize_aligned("", &[], &StandardTokenizer::new(), &TextOptions::default());
        assert_eq!(sentences.len(), 1);
        assert!(sentences[0].is_empty());
    }
}
