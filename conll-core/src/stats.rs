//! # Estatísticas do corpus
//!
//! Resumos calculados diretamente sobre os `.ann` de um diretório, sem passar
//! pela conversão:
//!
//! - total de menções e frequência por tipo (global e por documento);
//! - frequência de atributos e quantidade de relações;
//! - matriz de aninhamento entre os sete tipos canônicos;
//! - comprimento, em tokens, de cada menção por tipo.
//!
//! Cada estatística é calculada em três grupos: documentos de especialidades
//! odontológicas, os demais e o total.
//! A especialidade de cada documento vem de um JSON `{"<arquivo>": "<ESPECIALIDADE>"}`
//! ([`SpecialtyMap`]). Sem esse mapa, todo documento cai no grupo não odontológico.
//!
//! O resultado é serializável em JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotation::{parse_annotations, AnnotationDocument, EntityCategory, EntitySpan};
use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;

/// Especialidades consideradas odontológicas.
pub const DENTAL_SPECIALTIES: &[&str] = &[
    "ENDODONCIA",
    "OPERATORIA",
    "REHABILITACION: PROTESIS FIJA",
    "CIRUGIA MAXILO FACIAL",
    "ODONTOLOGIA INDIFERENCIADO",
    "REHABILITACION: PROTESIS REMOVIBLE",
    "TRASTORNOS TEMPOROMANDIBULARES Y DOLOR OROFACIAL",
    "CIRUGIA BUCAL",
    "PERIODONCIA",
];

/// Especialidade de origem de cada documento, indexada pelo id (nome sem extensão).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialtyMap {
    specialties: BTreeMap<String, String>,
}

impl SpecialtyMap {
    /// Lê o mapa de um arquivo JSON.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&raw)
    }

    /// As chaves podem trazer extensão (`caso_001.txt`); tudo a partir do
    /// primeiro ponto é descartado.
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> =
            serde_json::from_str(raw).map_err(|e| Error::config(e.to_string()))?;
        let specialties = entries
            .into_iter()
            .map(|(file, specialty)| {
                let id = file.split('.').next().unwrap_or_default().to_string();
                (id, specialty)
            })
            .collect();
        Ok(Self { specialties })
    }

    pub fn specialty(&self, id: &str) -> Option<&str> {
        self.specialties.get(id).map(String::as_str)
    }

    pub fn is_dental(&self, id: &str) -> bool {
        self.specialty(id).is_some_and(|s| DENTAL_SPECIALTIES.contains(&s))
    }
}

/// Matriz de aninhamento: `counts[inner][outer]` conta quantas vezes uma
/// menção do tipo `inner` está contida numa menção do tipo `outer`.
///
/// Linhas e colunas seguem a ordem de [`EntityCategory::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedMatrix {
    pub labels: Vec<String>,
    pub counts: [[usize; 7]; 7],
}

impl Default for NestedMatrix {
    fn default() -> Self {
        Self {
            labels: EntityCategory::ALL.iter().map(|c| c.name().to_string()).collect(),
            counts: [[0; 7]; 7],
        }
    }
}

impl NestedMatrix {
    /// Soma os pares (externa, interna) de um documento.
    ///
    /// Uma menção conta como interna se está contida na externa (bordas iguais
    /// inclusive) e vem de outra linha. Tipos fora do conjunto canônico são
    /// ignorados.
    pub fn add_document(&mut self, entities: &[EntitySpan]) {
        for outer in entities {
            let Some(outer_cat) = EntityCategory::from_label(&outer.label) else {
                continue;
            };
            for inner in entities {
                if inner.line == outer.line {
                    continue;
                }
                if inner.start >= outer.start && inner.end <= outer.end {
                    if let Some(inner_cat) = EntityCategory::from_label(&inner.label) {
                        self.counts[inner_cat.index()][outer_cat.index()] += 1;
                    }
                }
            }
        }
    }

    /// Vezes em que `inner` apareceu dentro de `outer`.
    pub fn get(&self, inner: EntityCategory, outer: EntityCategory) -> usize {
        self.counts[inner.index()][outer.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Estatísticas agregadas de um diretório de anotações.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub entities: usize,
    pub discontinuous: usize,
    pub relations: usize,
    pub entities_per_label: BTreeMap<String, usize>,
    pub entities_per_document: BTreeMap<String, BTreeMap<String, usize>>,
    pub attributes: BTreeMap<String, usize>,
    pub nested: NestedMatrix,
    /// Comprimento em tokens de cada menção, agrupado por tipo.
    pub tokens_per_entity: BTreeMap<String, Vec<usize>>,
}

impl CorpusStats {
    /// Acrescenta um documento já parseado.
    pub fn add_document(&mut self, id: &str, doc: &AnnotationDocument, tokenizer: &dyn Tokenizer) {
        self.documents += 1;
        self.entities += doc.entities.len();
        self.discontinuous += doc.discontinuous;
        self.relations += doc.relations;

        let per_doc = self.entities_per_document.entry(id.to_string()).or_default();
        for entity in &doc.entities {
            *self.entities_per_label.entry(entity.label.clone()).or_default() += 1;
            *per_doc.entry(entity.label.clone()).or_default() += 1;

            let length: usize = tokenizer.tokenize(&entity.text).iter().map(Vec::len).sum();
            self.tokens_per_entity
                .entry(entity.label.clone())
                .or_default()
                .push(length);
        }
        for attribute in &doc.attributes {
            *self.attributes.entry(attribute.clone()).or_default() += 1;
        }
        self.nested.add_document(&doc.entities);
    }
}

/// As mesmas estatísticas separadas por grupo de especialidade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedStats {
    pub dental: CorpusStats,
    pub non_dental: CorpusStats,
    pub total: CorpusStats,
}

impl GroupedStats {
    /// Acrescenta o documento ao seu grupo e ao total.
    pub fn add_document(&mut self, id: &str, doc: &AnnotationDocument, tokenizer: &dyn Tokenizer, dental: bool) {
        let group = if dental { &mut self.dental } else { &mut self.non_dental };
        group.add_document(id, doc, tokenizer);
        self.total.add_document(id, doc, tokenizer);
    }

    /// JSON indentado.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Percorre todos os `.ann` de `dir` (em ordem de nome).
///
/// `specialties` decide o grupo de cada documento; ids ausentes do mapa são
/// não odontológicos.
pub fn collect_stats(
    dir: &Path,
    tokenizer: &dyn Tokenizer,
    specialties: Option<&SpecialtyMap>,
) -> Result<GroupedStats> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut ann_paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "ann") {
            ann_paths.push(path);
        }
    }
    ann_paths.sort();

    let mut stats = GroupedStats::default();
    for path in &ann_paths {
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let doc = parse_annotations(&source).map_err(|e| e.in_file(path))?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dental = specialties.is_some_and(|map| map.is_dental(&id));
        stats.add_document(&id, &doc, tokenizer, dental);
    }

    tracing::info!(
        documents = stats.total.documents,
        dental = stats.dental.documents,
        entities = stats.total.entities,
        "estatísticas calculadas"
    );
    Ok(stats)
}
