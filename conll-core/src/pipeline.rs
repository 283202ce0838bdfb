//! # Pipeline de Conversão: Orquestrador do corpus
//!
//! Coordena todos os módulos para cada par `<id>.txt` / `<id>.ann` de um
//! diretório:
//!
//! 1. **Verificação** ([`check_files`]): todo `.txt` precisa do seu `.ann`.
//! 2. **Parsing** ([`annotation`](crate::annotation)): menções, atributos, relações.
//! 3. **Reconciliação** ([`reconcile`](crate::reconcile)): filtro de tipos, flat e nested.
//! 4. **Tokenização alinhada** ([`alignment`](crate::alignment)): sempre sobre o conjunto flat.
//! 5. **Etiquetagem** ([`tagger`](crate::tagger)): flat ou nested, conforme a configuração.
//! 6. **Escrita** ([`conll`](crate::conll)): um único arquivo de saída para o corpus.
//!
//! Os documentos são independentes. Com `parallel` habilitado eles são
//! convertidos com Rayon e escritos depois, na ordem dos nomes de arquivo, de
//! modo que a saída é idêntica à da execução sequencial. Qualquer documento
//! inválido interrompe o corpus inteiro.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::alignment::{tokenize_aligned, TextOptions};
use crate::annotation::{parse_annotations, AnnotationDocument};
use crate::conll::{render_document, ConllWriter};
use crate::error::{Error, Result};
use crate::offset::SpanConverter;
use crate::reconcile::{ReconcileMode, ReconciledEntities, TypeFilter};
use crate::tagger::{assign_tags, invalid_transitions, TaggedSentence};
use crate::tokenizer::{Tokenizer, TokenizerMode};

/// Configuração da conversão.
///
/// Pode ser lida de um JSON (campos ausentes assumem o padrão):
///
/// ```json
/// { "types": ["Finding", "Disease"], "nested": true, "lowercase": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Tipos de entidade mantidos. `None` mantém todos.
    pub types: Option<Vec<String>>,
    /// Etiqueta com todas as camadas (multi-CoNLL) em vez do conjunto flat.
    pub nested: bool,
    /// Texto dos tokens em minúsculas.
    pub lowercase: bool,
    /// Remove acentos agudos das vogais.
    pub strip_accents: bool,
    /// Escreve uma linha `-DOCSTART- <id>` antes de cada documento.
    pub header: bool,
    /// Registra o progresso de cada documento em nível `info`.
    pub verbose: bool,
    /// Tokenizador usado nas regiões.
    pub tokenizer: TokenizerMode,
    /// Converte documentos em paralelo (a ordem da saída não muda).
    pub parallel: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            types: None,
            nested: false,
            lowercase: false,
            strip_accents: false,
            header: false,
            verbose: false,
            tokenizer: TokenizerMode::default(),
            parallel: true,
        }
    }
}

impl ConvertOptions {
    /// Lê as opções de um arquivo JSON.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::config(e.to_string()))
    }

    pub fn mode(&self) -> ReconcileMode {
        if self.nested {
            ReconcileMode::Nested
        } else {
            ReconcileMode::Flat
        }
    }

    pub fn text_options(&self) -> TextOptions {
        TextOptions {
            lowercase: self.lowercase,
            strip_accents: self.strip_accents,
        }
    }

    pub fn type_filter(&self) -> TypeFilter {
        TypeFilter::from_types(self.types.as_deref())
    }
}

/// Um par de arquivos de entrada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPair {
    /// Nome base comum aos dois arquivos.
    pub id: String,
    pub text_path: PathBuf,
    pub ann_path: PathBuf,
}

/// Lista os pares do diretório, em ordem de nome, exigindo um `.ann` para cada `.txt`.
pub fn check_files(dir: &Path) -> Result<Vec<DocumentPair>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut text_paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            text_paths.push(path);
        }
    }
    text_paths.sort();

    text_paths
        .into_iter()
        .map(|text_path| {
            let ann_path = text_path.with_extension("ann");
            if !ann_path.exists() {
                return Err(Error::MissingAnnotation { path: ann_path });
            }
            let id = text_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(DocumentPair {
                id,
                text_path,
                ann_path,
            })
        })
        .collect()
}

/// Um documento carregado e validado.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub annotations: AnnotationDocument,
}

impl Document {
    /// Lê os dois arquivos (UTF-8) e valida as anotações contra o texto.
    pub fn load(pair: &DocumentPair) -> Result<Self> {
        let text = fs::read_to_string(&pair.text_path).map_err(|e| Error::io(&pair.text_path, e))?;
        let ann = fs::read_to_string(&pair.ann_path).map_err(|e| Error::io(&pair.ann_path, e))?;
        Self::from_parts(&pair.id, text, &ann).map_err(|e| e.in_file(&pair.ann_path))
    }

    /// Monta um documento a partir do conteúdo já em memória.
    pub fn from_parts(id: &str, text: String, ann: &str) -> Result<Self> {
        let annotations = parse_annotations(ann)?;
        let doc = Self {
            id: id.to_string(),
            text,
            annotations,
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Offsets fora do texto são fatais; texto anotado divergente só gera aviso.
    fn validate(&self) -> Result<()> {
        let conv = SpanConverter::new(&self.text);
        let len = conv.char_len();

        for entity in &self.annotations.entities {
            if entity.end > len {
                return Err(Error::OffsetOutOfBounds {
                    file: None,
                    id: entity.id.clone(),
                    start: entity.start,
                    end: entity.end,
                    len,
                });
            }
            let surface = conv.slice(&self.text, entity.start, entity.end);
            if !same_words(surface, &entity.text) {
                tracing::warn!(
                    document = %self.id,
                    entity = %entity.id,
                    expected = %entity.text,
                    found = %surface,
                    "texto anotado diverge do texto nos offsets"
                );
            }
        }
        Ok(())
    }
}

fn same_words(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}

/// Resultado da conversão de um documento.
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub id: String,
    pub sentences: Vec<TaggedSentence>,
    /// Entidades usadas na etiquetagem (após filtro e reconciliação).
    pub entities: usize,
    pub discontinuous: usize,
}

impl ConvertedDocument {
    pub fn tokens(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }
}

/// Estatísticas de uma execução.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertSummary {
    pub documents: usize,
    pub tokens: usize,
    pub entities: usize,
    pub discontinuous: usize,
}

impl ConvertSummary {
    fn add(&mut self, doc: &ConvertedDocument) {
        self.documents += 1;
        self.tokens += doc.tokens();
        self.entities += doc.entities;
        self.discontinuous += doc.discontinuous;
    }
}

/// O conversor BRAT → CoNLL.
pub struct Converter {
    options: ConvertOptions,
    tokenizer: Box<dyn Tokenizer>,
    filter: TypeFilter,
}

impl Converter {
    /// Cria o conversor com o tokenizador escolhido nas opções.
    pub fn new(options: ConvertOptions) -> Self {
        let tokenizer = options.tokenizer.build();
        Self::with_tokenizer(options, tokenizer)
    }

    /// Cria o conversor com um serviço de tokenização externo.
    pub fn with_tokenizer(options: ConvertOptions, tokenizer: Box<dyn Tokenizer>) -> Self {
        let filter = options.type_filter();
        Self {
            options,
            tokenizer,
            filter,
        }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Reconcilia, tokeniza e etiqueta um documento.
    pub fn convert_document(&self, doc: &Document) -> ConvertedDocument {
        let reconciled = ReconciledEntities::build(&doc.annotations.entities, &self.filter);
        let entities = reconciled.for_mode(self.options.mode());

        let sentences = tokenize_aligned(
            &doc.text,
            &reconciled.flat,
            self.tokenizer.as_ref(),
            &self.options.text_options(),
        );
        let tagged = assign_tags(&sentences, entities);
        for (label, index) in tagged.iter().flat_map(|s| invalid_transitions(s)) {
            tracing::warn!(document = %doc.id, label = %label, token = index, "sequência BIO inválida");
        }

        let converted = ConvertedDocument {
            id: doc.id.clone(),
            sentences: tagged,
            entities: entities.len(),
            discontinuous: doc.annotations.discontinuous,
        };
        if self.options.verbose {
            tracing::info!(document = %doc.id, tokens = converted.tokens(), entities = converted.entities, "documento convertido");
        } else {
            tracing::debug!(document = %doc.id, tokens = converted.tokens(), entities = converted.entities, "documento convertido");
        }
        converted
    }

    /// Texto CoNLL de um documento convertido.
    pub fn render(&self, converted: &ConvertedDocument) -> String {
        let header = self.options.header.then_some(converted.id.as_str());
        render_document(header, &converted.sentences)
    }

    fn process(&self, pair: &DocumentPair) -> Result<(ConvertedDocument, String)> {
        let doc = Document::load(pair)?;
        let converted = self.convert_document(&doc);
        let rendered = self.render(&converted);
        Ok((converted, rendered))
    }

    /// Converte todos os pares de `dir`, escrevendo em `out`.
    pub fn convert_corpus<W: Write>(&self, dir: &Path, out: W) -> Result<ConvertSummary> {
        let pairs = check_files(dir)?;
        self.convert_pairs(&pairs, out, Path::new("<saída>"))
    }

    /// Converte `dir` para o arquivo `output`, criando o diretório pai se preciso.
    ///
    /// A verificação dos pares acontece antes de o arquivo ser criado.
    pub fn convert_to_path(&self, dir: &Path, output: &Path) -> Result<ConvertSummary> {
        let pairs = check_files(dir)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = File::create(output).map_err(|e| Error::io(output, e))?;
        self.convert_pairs(&pairs, BufWriter::new(file), output)
    }

    /// `sink` só identifica o destino nas mensagens de erro de escrita.
    fn convert_pairs<W: Write>(&self, pairs: &[DocumentPair], out: W, sink: &Path) -> Result<ConvertSummary> {
        let mut writer = ConllWriter::new(out);
        let mut summary = ConvertSummary::default();

        if self.options.parallel {
            // Cada posição guarda o resultado do seu par; o erro reportado é o
            // do primeiro documento em ordem de nome, como no modo sequencial.
            let outcomes: Vec<Result<(ConvertedDocument, String)>> = pairs
                .par_iter()
                .map(|pair| self.process(pair))
                .collect();
            let results = outcomes.into_iter().collect::<Result<Vec<_>>>()?;
            for (converted, rendered) in &results {
                writer.write_rendered(rendered).map_err(|e| Error::io(sink, e))?;
                summary.add(converted);
            }
        } else {
            for pair in pairs {
                let (converted, rendered) = self.process(pair)?;
                writer.write_rendered(&rendered).map_err(|e| Error::io(sink, e))?;
                summary.add(&converted);
            }
        }
        writer.finish().map_err(|e| Error::io(sink, e))?;

        tracing::info!(
            documents = summary.documents,
            tokens = summary.tokens,
            entities = summary.entities,
            "corpus convertido"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_from_empty_json() {
        let opts = ConvertOptions::from_json("{}").unwrap();
        assert_eq!(opts, ConvertOptions::default());
        assert!(opts.parallel);
        assert_eq!(opts.mode(), ReconcileMode::Flat);
    }

    #[test]
    fn test_options_from_json() {
        let opts = ConvertOptions::from_json(
            r#"{"types": ["Sign_or_Symptom"], "nested": true, "tokenizer": "unicode", "strip_accents": true}"#,
        )
        .unwrap();
        assert_eq!(opts.mode(), ReconcileMode::Nested);
        assert_eq!(opts.tokenizer, TokenizerMode::Unicode);
        assert!(opts.text_options().strip_accents);
        assert!(opts.type_filter().allows("Finding"));
        assert!(!opts.type_filter().allows("Disease"));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ConvertOptions::from_json("{\"nested\": \"sí\"}").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_document_offsets_out_of_bounds() {
        let err = Document::from_parts("d", "fiebre".into(), "T1 Finding 0 10 fiebre alta").unwrap_err();
        assert!(matches!(err, Error::OffsetOutOfBounds { end: 10, len: 6, .. }));
    }

    #[test]
    fn test_convert_scenario_document() {
        let doc = Document::from_parts(
            "caso",
            "Paciente con dolor abdominal.".into(),
            "T1 Clinical_Finding 12 28 dolor abdominal",
        )
        .unwrap();
        let converter = Converter::new(ConvertOptions::default());
        let converted = converter.convert_document(&doc);
        assert_eq!(converted.tokens(), 5);
        assert_eq!(
            converter.render(&converted),
            "Paciente O\ncon O\ndolor B-Finding\nabdominal I-Finding\n. O\n\n"
        );
    }

    #[test]
    fn test_header_and_lowercase() {
        let doc = Document::from_parts("caso_7", "Úlcera GÁSTRICA".into(), "T1 Disease 0 15 Úlcera GÁSTRICA").unwrap();
        let options = ConvertOptions {
            header: true,
            lowercase: true,
            strip_accents: true,
            ..ConvertOptions::default()
        };
        let converter = Converter::new(options);
        let rendered = converter.render(&converter.convert_document(&doc));
        assert_eq!(rendered, "-DOCSTART- caso_7\nulcera B-Disease\ngastrica I-Disease\n\n");
    }
}
