//! # Reconciliação de Entidades
//!
//! Anotadores diferentes produzem spans duplicados, aninhados e com tipos
//! conflitantes sobre o mesmo trecho. Este módulo resolve isso em dois modos:
//!
//! - **Flat**: nenhum span aninhado sobrevive (o mais externo vence) e, entre
//!   spans com offsets idênticos, apenas o primeiro na ordem do documento é
//!   mantido, independentemente do rótulo.
//! - **Nested**: todos os spans bem formados são mantidos, inclusive duplicados,
//!   para gerar um CoNLL com múltiplas camadas.
//!
//! Ambos devolvem as entidades ordenadas por `start`, com ordenação estável
//! (empates preservam a ordem das linhas do `.ann`).
//!
//! ## Exemplo
//!
//! ```text
//! T1 Disease  0 20 neumonía adquirida
//! T2 Finding  0  8 neumonía          ← aninhado em T1 → descartado no flat
//! T3 Finding 25 31 fiebre
//! T4 Disease 25 31 fiebre            ← mesmo span de T3 → descartado no flat
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::annotation::{simplify_entity, EntitySpan};

/// Filtro de tipos de entidade aplicado antes da reconciliação.
///
/// Os nomes passam pela mesma simplificação do parser, então pedir
/// `Sign_or_Symptom` seleciona `Finding`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFilter {
    allowed: Option<HashSet<String>>,
}

impl TypeFilter {
    /// Filtro que aceita qualquer rótulo.
    pub fn all() -> Self {
        Self { allowed: None }
    }

    /// Restringe aos tipos informados. Uma lista ausente aceita tudo.
    pub fn from_types<S: AsRef<str>>(types: Option<&[S]>) -> Self {
        let allowed = types.map(|list| {
            list.iter()
                .map(|t| simplify_entity(t.as_ref()).to_string())
                .collect::<HashSet<_>>()
        });
        Self { allowed }
    }

    pub fn allows(&self, label: &str) -> bool {
        match &self.allowed {
            Some(set) => set.contains(label),
            None => true,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_none()
    }
}

/// Mantém apenas as entidades cujos rótulos o filtro aceita.
pub fn filter_types(entities: &[EntitySpan], filter: &TypeFilter) -> Vec<EntitySpan> {
    entities
        .iter()
        .filter(|e| filter.allows(&e.label))
        .cloned()
        .collect()
}

/// Conjunto flat: sem spans aninhados e sem offsets repetidos.
///
/// Para cada entidade, na ordem do documento, procura (em O(n²)) qualquer outra
/// linha que a contenha. Offsets idênticos não contam como aninhamento: entre
/// eles vence o de menor `line`, e os seguintes são descartados mesmo que sejam
/// cópias exatas.
pub fn flat_entities(entities: &[EntitySpan]) -> Vec<EntitySpan> {
    let mut ordered: Vec<&EntitySpan> = entities.iter().collect();
    ordered.sort_by_key(|e| e.line);

    let mut seen_spans: HashSet<(usize, usize)> = HashSet::new();
    let mut kept = Vec::new();

    for (i, entity) in ordered.iter().enumerate() {
        let nested = ordered
            .iter()
            .enumerate()
            .any(|(j, other)| i != j && entity.is_nested_in(other));
        if nested {
            continue;
        }
        // Duplicados e spans únicos seguem a mesma regra: só o primeiro entra.
        if seen_spans.insert(entity.span()) {
            kept.push((*entity).clone());
        }
    }

    sort_by_start(&mut kept);
    kept
}

/// Conjunto nested: todas as entidades, ordenadas por início.
pub fn nested_entities(entities: &[EntitySpan]) -> Vec<EntitySpan> {
    let mut all = entities.to_vec();
    all.sort_by_key(|e| e.line);
    sort_by_start(&mut all);
    all
}

/// Ordenação estável por offset inicial.
fn sort_by_start(entities: &mut [EntitySpan]) {
    entities.sort_by_key(|e| e.start);
}

/// Modo de reconciliação escolhido para a etiquetagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Apenas a camada mais externa.
    #[default]
    Flat,
    /// Todas as camadas (multi-CoNLL).
    Nested,
}

/// Os dois conjuntos reconciliados de um documento.
#[derive(Debug, Clone, Default)]
pub struct ReconciledEntities {
    pub flat: Vec<EntitySpan>,
    pub nested: Vec<EntitySpan>,
}

impl ReconciledEntities {
    /// Filtra por tipo e produz as duas variantes a partir da mesma lista.
    pub fn build(entities: &[EntitySpan], filter: &TypeFilter) -> Self {
        let filtered = filter_types(entities, filter);
        Self {
            flat: flat_entities(&filtered),
            nested: nested_entities(&filtered),
        }
    }

    /// A variante usada na etiquetagem.
    pub fn for_mode(&self, mode: ReconcileMode) -> &[EntitySpan] {
        match mode {
            ReconcileMode::Flat => &self.flat,
            ReconcileMode::Nested => &self.nested,
        }
    }
}
