//! # Formato CoNLL
//!
//! Cada documento vira um bloco de linhas `token RÓTULOS`:
//!
//! ```text
//! -DOCSTART- caso_001      ← só com o cabeçalho habilitado
//! Paciente O
//! con O
//! dolor B-Finding
//! abdominal I-Finding
//! . O
//!                          ← fim da unidade de sentença / documento
//! ```
//!
//! No modo nested a coluna de rótulos pode ter várias tags separadas por
//! espaço (`rodilla I-Finding B-Body_Part`). Pontos no meio da sentença recebem
//! uma linha em branco extra.

use std::io::{self, Write};

use crate::tagger::{Tag, TaggedSentence};

/// Prefixo da linha de cabeçalho de documento.
pub const DOCSTART: &str = "-DOCSTART-";

/// Renderiza um documento etiquetado como texto CoNLL.
pub fn render_document(header: Option<&str>, sentences: &[TaggedSentence]) -> String {
    let mut out = String::new();
    if let Some(id) = header {
        out.push_str(DOCSTART);
        out.push(' ');
        out.push_str(id);
        out.push('\n');
    }
    for sentence in sentences {
        for tagged in sentence {
            out.push_str(&tagged.token.text);
            out.push(' ');
            out.push_str(&tagged.labels());
            out.push('\n');
            if tagged.split_after {
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out
}

/// Escreve documentos em sequência num único destino.
pub struct ConllWriter<W: Write> {
    inner: W,
}

impl<W: Write> ConllWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Acrescenta um documento já renderizado.
    pub fn write_rendered(&mut self, rendered: &str) -> io::Result<()> {
        self.inner.write_all(rendered.as_bytes())
    }

    /// Esvazia o buffer e devolve o destino.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Uma linha de token lida de volta: texto e tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConllLine {
    pub text: String,
    pub tags: Vec<Tag>,
}

/// Lê um arquivo CoNLL gerado por este crate em blocos separados por linha em branco.
///
/// Linhas de cabeçalho são ignoradas e rótulos desconhecidos viram `O`.
pub fn read_blocks(source: &str) -> Vec<Vec<ConllLine>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in source.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        if line.starts_with(DOCSTART) {
            continue;
        }
        let mut fields = line.split(' ');
        let text = fields.next().unwrap_or_default().to_string();
        let tags = fields
            .map(|f| Tag::from_label(f).unwrap_or(Tag::Outside))
            .filter(|t| *t != Tag::Outside)
            .collect();
        current.push(ConllLine { text, tags });
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::TaggedToken;
    use crate::tokenizer::Token;

    fn tok(text: &str, tags: Vec<Tag>, split_after: bool) -> TaggedToken {
        TaggedToken {
            token: Token { text: text.into(), start: 0, end: 0, index: 0 },
            tags,
            split_after,
        }
    }

    #[test]
    fn test_render_document() {
        let sentence = vec![
            tok("fiebre", vec![Tag::Begin("Finding".into())], false),
            tok(".", vec![], true),
            tok("tos", vec![Tag::Begin("Finding".into()), Tag::Begin("Disease".into())], false),
        ];
        let rendered = render_document(Some("doc1"), &[sentence]);
        assert_eq!(
            rendered,
            "-DOCSTART- doc1\nfiebre B-Finding\n. O\n\ntos B-Finding B-Disease\n\n"
        );
    }

    #[test]
    fn test_empty_document_is_single_blank_line() {
        assert_eq!(render_document(None, &[vec![]]), "\n");
    }

    #[test]
    fn test_writer_concatenates_documents() {
        let mut writer = ConllWriter::new(Vec::new());
        for text in ["a", "b"] {
            let rendered = render_document(None, &[vec![tok(text, vec![], false)]]);
            writer.write_rendered(&rendered).unwrap();
        }
        let bytes = writer.finish().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a O\n\nb O\n\n");
    }

    #[test]
    fn test_read_blocks() {
        let source = "-DOCSTART- x\ndolor B-Finding\nabdominal I-Finding\n. O\n\nfin O\n\n";
        let blocks = read_blocks(source);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0][1].tags, vec![Tag::Inside("Finding".into())]);
        assert!(blocks[0][2].tags.is_empty());
    }
}
