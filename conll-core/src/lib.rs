//! # conll-core: Conversão de anotações BRAT para CoNLL
//!
//! Este crate transforma um corpus clínico anotado no formato *standoff* do BRAT
//! (um `.txt` com o texto e um `.ann` com as menções por offset de caractere) em
//! um arquivo CoNLL com uma linha `token RÓTULOS` por token, pronto para treinar
//! modelos de NER.
//!
//! ## Arquitetura do Sistema
//!
//! Cada documento passa pelos estágios abaixo:
//!
//! 1.  **Leitura** ([`annotation`]): linhas `T` viram [`EntitySpan`]s com o tipo já simplificado
//!     (ex: `Sign_or_Symptom` → `Finding`). Menções descontínuas são descartadas.
//! 2.  **Reconciliação** ([`reconcile`]): filtro de tipos e, no modo flat, remoção das menções
//!     aninhadas em outras.
//! 3.  **Tokenização alinhada** ([`alignment`], [`tokenizer`]): o texto é cortado nas bordas das
//!     entidades e cada região é tokenizada isoladamente, de modo que nenhum token atravesse uma borda.
//! 4.  **Etiquetagem** ([`tagger`]): tags BIO por tipo, com várias camadas no modo nested.
//! 5.  **Saída** ([`conll`]): blocos CoNLL, concatenados na ordem dos arquivos.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use conll_core::{ConvertOptions, Converter, Document};
//!
//! let doc = Document::from_parts(
//!     "caso_001",
//!     "Paciente con dolor abdominal.".to_string(),
//!     "T1\tClinical_Finding 12 28\tdolor abdominal\n",
//! )
//! .unwrap();
//!
//! let converter = Converter::new(ConvertOptions::default());
//! let converted = converter.convert_document(&doc);
//! let conll = converter.render(&converted);
//!
//! assert!(conll.contains("dolor B-Finding\nabdominal I-Finding\n"));
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: Orquestrador que percorre o diretório e escreve a saída.
//! - [`stats`]: Estatísticas do corpus (frequências, aninhamentos, tamanhos).
//! - [`error`]: Erros fatais da conversão.

pub mod alignment;
pub mod annotation;
pub mod conll;
pub mod error;
pub mod offset;
pub mod pipeline;
pub mod reconcile;
pub mod stats;
pub mod tagger;
pub mod tokenizer;

pub use annotation::{simplify_entity, EntityCategory, EntitySpan};
pub use error::{Error, Result};
pub use pipeline::{check_files, ConvertOptions, ConvertSummary, Converter, Document};
pub use reconcile::ReconcileMode;
pub use stats::{collect_stats, CorpusStats, GroupedStats, SpecialtyMap};
pub use tagger::{Tag, TaggedToken};
pub use tokenizer::{Token, TokenizerMode};
