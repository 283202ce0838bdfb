//! # Parser de Anotações BRAT (standoff)
//!
//! Um documento BRAT é composto por dois arquivos: o texto bruto (`.txt`) e o
//! arquivo de anotações (`.ann`), que referencia trechos do texto por offsets de
//! **caractere**. Cada linha do `.ann` é um registro separado por espaços:
//!
//! | Marcador | Registro          | Exemplo                                  |
//! |----------|-------------------|------------------------------------------|
//! | `T`      | Menção (entidade) | `T1 Disease 12 28 dolor abdominal`       |
//! | `A`/`M`  | Atributo          | `A1 Negation T1`                         |
//! | `R`      | Relação           | `R1 Location Arg1:T1 Arg2:T2`            |
//! | `E`, `N`, `#` | Ignorados    |                                          |
//!
//! Menções descontínuas (`T3 Disease 5 10;15 20 ...`) não são suportadas e são
//! descartadas em silêncio.
//!
//! ## Exemplo
//!
//! ```rust
//! use conll_core::annotation::parse_entities;
//!
//! let ann = "T1 Clinical_Finding 12 28 dolor abdominal\n";
//! let entities = parse_entities(ann).unwrap();
//! assert_eq!(entities[0].label, "Finding");
//! assert_eq!((entities[0].start, entities[0].end), (12, 28));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tipos canônicos de entidade do corpus clínico após a simplificação.
///
/// Rótulos fora deste conjunto continuam válidos (passam direto pela
/// simplificação), mas não participam da matriz de aninhamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityCategory {
    /// Achados clínicos: sinais, sintomas e resultados de exames.
    Finding,
    /// Procedimentos diagnósticos, terapêuticos e de laboratório.
    Procedure,
    /// Familiares do paciente ("madre", "hermano").
    FamilyMember,
    /// Doenças e diagnósticos.
    Disease,
    /// Partes do corpo.
    BodyPart,
    /// Medicamentos.
    Medication,
    /// Abreviaturas.
    Abbreviation,
}

impl EntityCategory {
    /// Todas as categorias, na ordem usada pela matriz de aninhamento.
    pub const ALL: [EntityCategory; 7] = [
        EntityCategory::Finding,
        EntityCategory::Procedure,
        EntityCategory::FamilyMember,
        EntityCategory::Disease,
        EntityCategory::BodyPart,
        EntityCategory::Medication,
        EntityCategory::Abbreviation,
    ];

    /// Nome do rótulo como aparece no corpus e na saída CoNLL.
    pub fn name(&self) -> &'static str {
        match self {
            EntityCategory::Finding => "Finding",
            EntityCategory::Procedure => "Procedure",
            EntityCategory::FamilyMember => "Family_Member",
            EntityCategory::Disease => "Disease",
            EntityCategory::BodyPart => "Body_Part",
            EntityCategory::Medication => "Medication",
            EntityCategory::Abbreviation => "Abbreviation",
        }
    }

    /// Índice da categoria em [`EntityCategory::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Tenta reconhecer um rótulo canônico (ex: "Body_Part" → Some(BodyPart)).
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == label)
    }
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Generaliza tipos finos do corpus de lista de espera para um conjunto menor.
///
/// Rótulos não mapeados são devolvidos sem alteração.
pub fn simplify_entity(label: &str) -> &str {
    match label {
        "Laboratory_or_Test_Result" | "Sign_or_Symptom" | "Clinical_Finding" => "Finding",
        "Procedure" | "Laboratory_Procedure" | "Therapeutic_Procedure" | "Diagnostic_Procedure" => {
            "Procedure"
        }
        other => other,
    }
}

/// Uma menção anotada no texto.
///
/// Criada a partir de uma única linha `T` e imutável depois disso. Os offsets
/// são de caractere (não de byte), semiabertos: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Marcador do registro (ex: "T1").
    pub id: String,
    /// Rótulo canônico (já simplificado).
    pub label: String,
    /// Offset de caractere inicial (inclusivo).
    pub start: usize,
    /// Offset de caractere final (exclusivo).
    pub end: usize,
    /// Texto anotado, com os campos unidos por um espaço.
    pub text: String,
    /// Índice (0-based) da linha de origem no `.ann`. Define a ordem do documento.
    pub line: usize,
}

impl EntitySpan {
    /// O intervalo `(start, end)` da menção.
    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// `true` se `self` está contido em `other` com ao menos uma borda estrita.
    ///
    /// Compartilhar uma das bordas ainda conta como aninhado
    /// (`[0, 5)` dentro de `[0, 10)`); intervalos idênticos não contam.
    pub fn is_nested_in(&self, other: &EntitySpan) -> bool {
        (self.start >= other.start && self.end < other.end)
            || (self.start > other.start && self.end <= other.end)
    }
}

/// Conteúdo completo de um `.ann`: menções, atributos e relações.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    /// Menções contínuas, na ordem do arquivo.
    pub entities: Vec<EntitySpan>,
    /// Nomes dos atributos (`A`/`M`), na ordem do arquivo.
    pub attributes: Vec<String>,
    /// Quantidade de relações (`R`).
    pub relations: usize,
    /// Quantidade de menções descontínuas descartadas.
    pub discontinuous: usize,
}

/// Extrai apenas as menções de um documento de anotação.
pub fn parse_entities(source: &str) -> Result<Vec<EntitySpan>> {
    Ok(parse_annotations(source)?.entities)
}

/// Lê um documento `.ann` inteiro em uma única passada.
///
/// Linhas em branco são ignoradas. Uma linha de menção com menos de quatro
/// campos, ou com offsets que não são inteiros positivos crescentes, é um erro
/// fatal de integridade do corpus.
pub fn parse_annotations(source: &str) -> Result<AnnotationDocument> {
    let mut doc = AnnotationDocument::default();

    for (line_idx, line) in source.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(marker) = fields.first() else {
            continue;
        };

        if marker.starts_with('T') {
            match parse_mention(&fields, line_idx, line)? {
                Some(entity) => doc.entities.push(entity),
                None => {
                    tracing::trace!(line = line_idx + 1, "menção descontínua ignorada");
                    doc.discontinuous += 1;
                }
            }
        } else if marker.starts_with('A') || marker.starts_with('M') {
            if let Some(name) = fields.get(1) {
                doc.attributes.push((*name).to_string());
            }
        } else if marker.starts_with('R') {
            doc.relations += 1;
        }
    }

    Ok(doc)
}

/// Converte os campos de uma linha `T`. `Ok(None)` indica span descontínuo.
fn parse_mention(fields: &[&str], line_idx: usize, line: &str) -> Result<Option<EntitySpan>> {
    let line_number = line_idx + 1;
    if fields.len() < 4 {
        return Err(Error::malformed(line_number, line, "campos insuficientes"));
    }
    if fields[3].contains(';') {
        return Ok(None);
    }

    let start = parse_offset(fields[2], line_number, line)?;
    let end = parse_offset(fields[3], line_number, line)?;
    if start >= end {
        return Err(Error::malformed(line_number, line, "offset inicial não é menor que o final"));
    }

    Ok(Some(EntitySpan {
        id: fields[0].to_string(),
        label: simplify_entity(fields[1]).to_string(),
        start,
        end,
        text: fields[4..].join(" "),
        line: line_idx,
    }))
}

fn parse_offset(field: &str, line_number: usize, line: &str) -> Result<usize> {
    field
        .parse::<usize>()
        .map_err(|_| Error::malformed(line_number, line, format!("offset inválido {:?}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_entity() {
        assert_eq!(simplify_entity("Sign_or_Symptom"), "Finding");
        assert_eq!(simplify_entity("Laboratory_or_Test_Result"), "Finding");
        assert_eq!(simplify_entity("Therapeutic_Procedure"), "Procedure");
        assert_eq!(simplify_entity("Disease"), "Disease");
        assert_eq!(simplify_entity("Unknown_Type"), "Unknown_Type");
    }

    #[test]
    fn test_parse_single_mention() {
        let entities = parse_entities("T1 Clinical_Finding 12 28 dolor abdominal").unwrap();
        assert_eq!(entities.len(), 1);
        let e = &entities[0];
        assert_eq!(e.id, "T1");
        assert_eq!(e.label, "Finding");
        assert_eq!(e.span(), (12, 28));
        assert_eq!(e.text, "dolor abdominal");
        assert_eq!(e.line, 0);
    }

    #[test]
    fn test_discontinuous_is_skipped() {
        let ann = "T1 Disease 0 5 fiebre\nT3 Disease 5 10;15 20 tos seca\n";
        let doc = parse_annotations(ann).unwrap();
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.discontinuous, 1);
    }

    #[test]
    fn test_attributes_and_relations() {
        let ann = "T1 Disease 0 5 fiebre\nA1 Negation T1\nR1 Location Arg1:T1 Arg2:T1\n#1 AnnotatorNotes T1 nota\n";
        let doc = parse_annotations(ann).unwrap();
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.attributes, vec!["Negation".to_string()]);
        assert_eq!(doc.relations, 1);
    }

    #[test]
    fn test_short_mention_is_fatal() {
        let err = parse_entities("T1 Disease 0").unwrap_err();
        assert!(matches!(err, Error::MalformedLine { line_number: 1, .. }));
    }

    #[test]
    fn test_non_numeric_offset_is_fatal() {
        assert!(parse_entities("T1 Disease a 5 fiebre").is_err());
        assert!(parse_entities("T1 Disease 5 5 fiebre").is_err());
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let entities = parse_entities("\nT1 Disease 0 5 fiebre\n   \n").unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].line, 1);
    }

    #[test]
    fn test_nesting_predicate() {
        let outer = EntitySpan { id: "T1".into(), label: "Finding".into(), start: 0, end: 10, text: String::new(), line: 0 };
        let same_start = EntitySpan { start: 0, end: 5, ..outer.clone() };
        let same_end = EntitySpan { start: 4, end: 10, ..outer.clone() };
        let equal = outer.clone();
        assert!(same_start.is_nested_in(&outer));
        assert!(same_end.is_nested_in(&outer));
        assert!(!equal.is_nested_in(&outer));
        assert!(!outer.is_nested_in(&same_start));
    }

    #[test]
    fn test_category_roundtrip_names() {
        for cat in EntityCategory::ALL {
            assert_eq!(EntityCategory::from_label(cat.name()), Some(cat));
        }
        assert_eq!(EntityCategory::from_label("Finding").map(|c| c.index()), Some(0));
    }
}
