//! # Atribuição de Tags BIO
//!
//! Percorre os tokens do documento contra as entidades reconciliadas (ordenadas
//! por início) e atribui a cada token as tags **BIO** de todas as entidades que
//! o cobrem.
//!
//! ## Esquema BIO
//!
//! - `B-TIPO`: Begin: primeiro token de uma entidade
//! - `I-TIPO`: Inside: tokens seguintes da mesma entidade
//! - `O`: Outside: o token não pertence a nenhuma entidade
//!
//! ## Estado por tipo
//!
//! O estado "há um span aberto" é mantido **por tipo de entidade**, não por
//! entidade, e é recriado a cada unidade de sentença ([`OpenSpans`]). No modo
//! nested, tipos diferentes podem estar abertos ao mesmo tempo e um token pode
//! acumular várias tags (`dolor B-Finding B-Body_Part`).
//!
//! ## Divisão forçada em pontos
//!
//! Um token `.` sem tags que não é o último da sua unidade de sentença recebe
//! uma linha em branco extra depois dele. Notas clínicas costumam ter frases
//! longas que o segmentador não separa.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alignment::Sentence;
use crate::annotation::{EntityCategory, EntitySpan};
use crate::tokenizer::Token;

/// Tag BIO aplicada a um token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// **Begin**: início de uma entidade. Ex: **dolor** (B-Finding) abdominal.
    Begin(String),
    /// **Inside**: continuação de uma entidade. Ex: dolor **abdominal** (I-Finding).
    Inside(String),
    /// **Outside**: o token não faz parte de nenhuma entidade.
    Outside,
}

impl Tag {
    /// Representação textual da tag (ex: "B-Finding", "I-Disease", "O")
    pub fn label(&self) -> String {
        match self {
            Tag::Begin(cat) => format!("B-{}", cat),
            Tag::Inside(cat) => format!("I-{}", cat),
            Tag::Outside => "O".to_string(),
        }
    }

    /// Retorna o tipo desta tag (se for B- ou I-)
    pub fn category(&self) -> Option<&str> {
        match self {
            Tag::Begin(c) | Tag::Inside(c) => Some(c),
            Tag::Outside => None,
        }
    }

    /// Verifica se a transição tag_prev → self é válida no esquema BIO
    ///
    /// Regras:
    /// - `I-X` só pode seguir `B-X` ou `I-X` (mesmo tipo)
    /// - `B-X` pode seguir qualquer tag
    /// - `O` pode seguir qualquer tag
    pub fn is_valid_transition(prev: &Tag, next: &Tag) -> bool {
        match next {
            Tag::Inside(cat) => match prev {
                Tag::Begin(prev_cat) | Tag::Inside(prev_cat) => prev_cat == cat,
                Tag::Outside => false,
            },
            _ => true,
        }
    }

    /// Parseia uma tag a partir de string (ex: "B-Body_Part" → Begin("Body_Part"))
    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(Tag::Outside);
        }
        let (prefix, cat) = s.split_once('-')?;
        if cat.is_empty() {
            return None;
        }
        match prefix {
            "B" => Some(Tag::Begin(cat.to_string())),
            "I" => Some(Tag::Inside(cat.to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Um token com todas as tags que recebeu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub token: Token,
    /// Tags na ordem em que as entidades foram visitadas. Vazio significa `O`.
    pub tags: Vec<Tag>,
    /// Linha em branco extra depois deste token (ponto no meio da sentença).
    pub split_after: bool,
}

impl TaggedToken {
    /// Coluna de rótulos do CoNLL: tags separadas por espaço, ou `O`.
    pub fn labels(&self) -> String {
        if self.tags.is_empty() {
            return Tag::Outside.label();
        }
        self.tags
            .iter()
            .map(Tag::label)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Uma unidade de sentença etiquetada.
pub type TaggedSentence = Vec<TaggedToken>;

/// Estado "span aberto" por tipo de entidade, válido para uma única sentença.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSpans {
    open: HashMap<String, bool>,
}

impl Default for OpenSpans {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenSpans {
    /// Todos os tipos canônicos começam fechados. Outros tipos entram sob demanda.
    pub fn new() -> Self {
        let open = EntityCategory::ALL
            .iter()
            .map(|c| (c.name().to_string(), false))
            .collect();
        Self { open }
    }

    pub fn is_open(&self, label: &str) -> bool {
        self.open.get(label).copied().unwrap_or(false)
    }

    fn set(&mut self, label: &str, value: bool) {
        match self.open.get_mut(label) {
            Some(flag) => *flag = value,
            None => {
                self.open.insert(label.to_string(), value);
            }
        }
    }

    pub fn open(&mut self, label: &str) {
        self.set(label, true);
    }

    pub fn close(&mut self, label: &str) {
        self.set(label, false);
    }
}

/// Atribui tags BIO a todas as sentenças.
///
/// `entities` deve estar ordenado por `start`: a varredura de cada token para
/// na primeira entidade que começa depois do fim do token.
pub fn assign_tags(sentences: &[Sentence], entities: &[EntitySpan]) -> Vec<TaggedSentence> {
    sentences
        .iter()
        .map(|sentence| tag_sentence(sentence, entities))
        .collect()
}

/// Etiqueta uma unidade de sentença com um estado [`OpenSpans`] novo.
pub fn tag_sentence(sentence: &[Token], entities: &[EntitySpan]) -> TaggedSentence {
    let mut state = OpenSpans::new();
    let last = sentence.len().saturating_sub(1);
    let ends = tagging_ends(sentence, entities);

    sentence
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let tags = tags_for_token(token, entities, &ends, &mut state);
            let split_after = tags.is_empty() && token.text == "." && i != last;
            TaggedToken {
                token: token.clone(),
                tags,
                split_after,
            }
        })
        .collect()
}

/// Fim efetivo de cada entidade: o fim do último token inteiramente contido nela.
///
/// Uma anotação que termina em espaço (`"fiebre "`) nunca coincide com o fim
/// de um token; sem o ajuste o tipo ficaria aberto e a próxima entidade do
/// mesmo tipo começaria com `I-`. Entidades sem token contido mantêm o fim
/// original e não recebem tags.
fn tagging_ends(sentence: &[Token], entities: &[EntitySpan]) -> Vec<usize> {
    entities
        .iter()
        .map(|entity| {
            sentence
                .iter()
                .filter(|t| t.start >= entity.start && t.end <= entity.end)
                .map(|t| t.end)
                .max()
                .unwrap_or(entity.end)
        })
        .collect()
}

fn tags_for_token(token: &Token, entities: &[EntitySpan], ends: &[usize], state: &mut OpenSpans) -> Vec<Tag> {
    let mut tags = Vec::new();

    for (entity, &end) in entities.iter().zip(ends) {
        if entity.start > token.end {
            break;
        }
        if token.start < entity.start {
            continue;
        }

        let label = entity.label.as_str();
        if token.end < end {
            if state.is_open(label) {
                tags.push(Tag::Inside(label.to_string()));
            } else {
                state.open(label);
                tags.push(Tag::Begin(label.to_string()));
            }
        } else if token.end == end {
            if state.is_open(label) {
                state.close(label);
                tags.push(Tag::Inside(label.to_string()));
            } else {
                tags.push(Tag::Begin(label.to_string()));
            }
        }
    }

    tags
}

/// Índice da primeira transição BIO inválida de uma sequência de uma camada.
pub fn first_invalid_transition(tags: &[Tag]) -> Option<usize> {
    let mut prev = Tag::Outside;
    for (i, tag) in tags.iter().enumerate() {
        if !Tag::is_valid_transition(&prev, tag) {
            return Some(i);
        }
        prev = tag.clone();
    }
    None
}

/// Transições inválidas por camada de rótulo: `(rótulo, índice do token)`.
///
/// Cada tipo presente na sentença é avaliado como uma sequência separada,
/// em que o token recebe a tag daquele tipo (a primeira, se houver mais de
/// uma) ou `O`.
pub fn invalid_transitions(sentence: &[TaggedToken]) -> Vec<(String, usize)> {
    let mut labels: Vec<&str> = sentence
        .iter()
        .flat_map(|t| t.tags.iter().filter_map(Tag::category))
        .collect();
    labels.sort_unstable();
    labels.dedup();

    labels
        .into_iter()
        .filter_map(|label| {
            let layer = label_layer(sentence, label);
            first_invalid_transition(&layer).map(|i| (label.to_string(), i))
        })
        .collect()
}

/// A sequência de tags de um único tipo ao longo da sentença.
pub fn label_layer(sentence: &[TaggedToken], label: &str) -> Vec<Tag> {
    sentence
        .iter()
        .map(|t| {
            t.tags
                .iter()
                .find(|tag| tag.category() == Some(label))
                .cloned()
                .unwrap_or(Tag::Outside)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{tokenize_aligned, TextOptions};
    use crate::annotation::parse_entities;
    use crate::reconcile::{flat_entities, nested_entities};
    use crate::tokenizer::StandardTokenizer;

    fn tag(text: &str, ann: &str, nested: bool) -> TaggedSentence {
        let parsed = parse_entities(ann).unwrap();
        let flat = flat_entities(&parsed);
        let entities = if nested { nested_entities(&parsed) } else { flat.clone() };
        let sentences = tokenize_aligned(text, &flat, &StandardTokenizer::new(), &TextOptions::default());
        assign_tags(&sentences, &entities).remove(0)
    }

    fn lines(tagged: &[TaggedToken]) -> Vec<String> {
        tagged
            .iter()
            .map(|t| format!("{} {}", t.token.text, t.labels()))
            .collect()
    }

    #[test]
    fn test_tag_labels() {
        assert_eq!(Tag::Outside.label(), "O");
        assert_eq!(Tag::Begin("Finding".into()).label(), "B-Finding");
        assert_eq!(Tag::Inside("Body_Part".into()).label(), "I-Body_Part");
    }

    #[test]
    fn test_tag_from_label() {
        assert_eq!(Tag::from_label("O"), Some(Tag::Outside));
        assert_eq!(Tag::from_label("B-Family_Member"), Some(Tag::Begin("Family_Member".into())));
        assert_eq!(Tag::from_label("I-Disease"), Some(Tag::Inside("Disease".into())));
        assert_eq!(Tag::from_label("X-Disease"), None);
        assert_eq!(Tag::from_label("B-"), None);
    }

    #[test]
    fn test_valid_transitions() {
        let b = Tag::Begin("Finding".into());
        let i = Tag::Inside("Finding".into());
        let other = Tag::Inside("Disease".into());
        assert!(Tag::is_valid_transition(&b, &i));
        assert!(Tag::is_valid_transition(&i, &i));
        assert!(!Tag::is_valid_transition(&Tag::Outside, &i));
        assert!(!Tag::is_valid_transition(&b, &other));
    }

    #[test]
    fn test_scenario_flat() {
        let tagged = tag("Paciente con dolor abdominal.", "T1 Clinical_Finding 12 28 dolor abdominal", false);
        assert_eq!(
            lines(&tagged),
            vec!["Paciente O", "con O", "dolor B-Finding", "abdominal I-Finding", ". O"]
        );
        // ponto final da sentença: sem divisão forçada
        assert!(!tagged[4].split_after);
    }

    #[test]
    fn test_single_token_entity_is_begin() {
        let tagged = tag("Toma paracetamol hoy", "T1 Medication 5 16 paracetamol", false);
        assert_eq!(lines(&tagged)[1], "paracetamol B-Medication");
        assert_eq!(lines(&tagged)[2], "hoy O");
    }

    #[test]
    fn test_mid_sentence_period_forces_split() {
        let tagged = tag("Refiere fiebre. Niega tos.", "", false);
        let splits: Vec<bool> = tagged.iter().map(|t| t.split_after).collect();
        assert_eq!(splits, vec![false, false, true, false, false, false]);
    }

    #[test]
    fn test_nested_layers_accumulate() {
        let text = "dolor de rodilla derecha";
        let ann = "T1 Finding 0 24 dolor de rodilla derecha\nT2 Body_Part 9 24 rodilla derecha";
        let tagged = tag(text, ann, true);
        assert_eq!(
            lines(&tagged),
            vec![
                "dolor B-Finding",
                "de I-Finding",
                "rodilla I-Finding B-Body_Part",
                "derecha I-Finding I-Body_Part",
            ]
        );
        let flat = tag(text, ann, false);
        assert_eq!(lines(&flat)[2], "rodilla I-Finding");
    }

    #[test]
    fn test_consecutive_entities_same_type() {
        let tagged = tag("fiebre tos seca", "T1 Finding 0 6 fiebre\nT2 Finding 7 15 tos seca", false);
        assert_eq!(
            lines(&tagged),
            vec!["fiebre B-Finding", "tos B-Finding", "seca I-Finding"]
        );
        assert!(invalid_transitions(&tagged).is_empty());
    }

    #[test]
    fn test_unknown_label_is_tracked() {
        let tagged = tag("gen BRCA1 mutado", "T1 Gene 4 9 BRCA1", false);
        assert_eq!(lines(&tagged)[1], "BRCA1 B-Gene");
    }

    #[test]
    fn test_open_spans_state() {
        let mut state = OpenSpans::new();
        assert!(!state.is_open("Finding"));
        state.open("Finding");
        assert!(state.is_open("Finding"));
        state.close("Finding");
        assert!(!state.is_open("Finding"));
        assert!(!state.is_open("Nuevo"));
    }

    #[test]
    fn test_trailing_space_in_annotation_closes_span() {
        let text = "fiebre y luego tos.";
        let ann = "T1 Sign_or_Symptom 0 7 fiebre\nT2 Sign_or_Symptom 15 18 tos";
        let tagged = tag(text, ann, false);
        assert_eq!(
            lines(&tagged),
            vec!["fiebre B-Finding", "y O", "luego O", "tos B-Finding", ". O"]
        );
        assert!(invalid_transitions(&tagged).is_empty());
    }

    #[test]
    fn test_nested_mid_word_end_closes_span() {
        // T2 termina no meio de "derechas": só entidades flat cortam regiões
        let text = "dolor en rodilla derechas y codo";
        let ann = "T1 Finding 0 25 dolor en rodilla derechas\nT2 Body_Part 9 24 rodilla derecha\nT3 Body_Part 28 32 codo";
        let tagged = tag(text, ann, true);
        assert_eq!(
            lines(&tagged),
            vec![
                "dolor B-Finding",
                "en I-Finding",
                "rodilla I-Finding B-Body_Part",
                "derechas I-Finding",
                "y O",
                "codo B-Body_Part",
            ]
        );
        assert!(invalid_transitions(&tagged).is_empty());
    }

    #[test]
    fn test_invalid_transitions_per_layer() {
        let token = |text: &str, tags: Vec<Tag>| TaggedToken {
            token: Token { text: text.into(), start: 0, end: 0, index: 0 },
            tags,
            split_after: false,
        };
        let sentence = vec![
            token("a", vec![Tag::Begin("Finding".into())]),
            token("b", vec![Tag::Inside("Finding".into()), Tag::Begin("Body_Part".into())]),
            token("c", vec![]),
            token("d", vec![Tag::Inside("Body_Part".into())]),
        ];
        assert_eq!(invalid_transitions(&sentence), vec![("Body_Part".to_string(), 3)]);
        assert_eq!(
            label_layer(&sentence, "Finding"),
            vec![Tag::Begin("Finding".into()), Tag::Inside("Finding".into()), Tag::Outside, Tag::Outside]
        );
    }

    #[test]
    fn test_first_invalid_transition() {
        let tags = vec![Tag::Outside, Tag::Inside("Finding".into())];
        assert_eq!(first_invalid_transition(&tags), Some(1));
    }
}
