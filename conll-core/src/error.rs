//! # Erros do conversor
//!
//! Todos os erros aqui são fatais para a execução: o conversor é um processo em
//! lote, de passada única, e um documento corrompido interrompe o corpus inteiro.
//! A única construção tolerada silenciosamente (spans descontínuos) nunca chega
//! a virar um [`Error`].

use std::path::PathBuf;

use thiserror::Error;

/// Tipo de resultado usado em todo o crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Falhas de integridade do corpus e de I/O.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Um `.txt` não possui o `.ann` correspondente.
    #[error("Arquivo de anotação não existe: {}", .path.display())]
    MissingAnnotation { path: PathBuf },

    /// Linha de menção com campos faltando ou offsets inválidos.
    #[error("Linha de anotação malformada{} (linha {line_number}): {reason}: {line:?}", file_suffix(.file))]
    MalformedLine {
        file: Option<PathBuf>,
        line_number: usize,
        line: String,
        reason: String,
    },

    /// Offsets de uma entidade fora dos limites do texto.
    #[error("Entidade {id} [{start}, {end}) fora dos limites do texto ({len} caracteres){}", file_suffix(.file))]
    OffsetOutOfBounds {
        file: Option<PathBuf>,
        id: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// Falha de leitura/escrita (inclui texto que não é UTF-8 válido).
    #[error("Erro de I/O em {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Arquivo de configuração inválido.
    #[error("Configuração inválida: {0}")]
    Config(String),

    /// Falha ao serializar um resultado em JSON.
    #[error("Falha ao serializar JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn file_suffix(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) => format!(" em {}", path.display()),
        None => String::new(),
    }
}

impl Error {
    /// Cria um erro de linha malformada (sem arquivo associado ainda).
    pub fn malformed(line_number: usize, line: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedLine {
            file: None,
            line_number,
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Cria um erro de I/O associado a um caminho.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Cria um erro de configuração.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Anexa o arquivo de origem a erros que ainda não o carregam.
    ///
    /// O parser trabalha sobre texto puro; quem conhece o caminho é o pipeline.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Error::MalformedLine {
                file: None,
                line_number,
                line,
                reason,
            } => Error::MalformedLine {
                file: Some(path.into()),
                line_number,
                line,
                reason,
            },
            Error::OffsetOutOfBounds {
                file: None,
                id,
                start,
                end,
                len,
            } => Error::OffsetOutOfBounds {
                file: Some(path.into()),
                id,
                start,
                end,
                len,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_file() {
        let err = Error::malformed(3, "T1 Disease", "campos insuficientes").in_file("corpus/doc1.ann");
        let msg = err.to_string();
        assert!(msg.contains("corpus/doc1.ann"));
        assert!(msg.contains("linha 3"));
    }

    #[test]
    fn test_in_file_keeps_existing_path() {
        let err = Error::MissingAnnotation {
            path: PathBuf::from("a.ann"),
        }
        .in_file("b.ann");
        assert!(err.to_string().contains("a.ann"));
    }

    #[test]
    fn test_json_failure_is_serialize_error() {
        use std::collections::BTreeMap;

        // chaves que não são strings não têm representação em JSON
        let bad: BTreeMap<Vec<u8>, u8> = [(vec![1], 1)].into_iter().collect();
        let err: Error = serde_json::to_string(&bad).unwrap_err().into();
        assert!(matches!(err, Error::Serialize(_)));
        assert!(err.to_string().starts_with("Falha ao serializar JSON"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
