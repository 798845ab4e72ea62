// src/common/db_utils.rs

// ---
// Consultas tolerantes a schema antigo
// ---
// Algumas colunas/tabelas chegaram em migrações posteriores. Em vez de
// estourar, a consulta "preferida" devolve um resultado marcado e quem chamou
// refaz a consulta num formato reduzido.

use sqlx::error::DatabaseError;

use crate::common::error::AppError;

const UNDEFINED_COLUMN: &str = "42703";
const UNDEFINED_TABLE: &str = "42P01";

/// Parte opcional do schema da qual uma consulta depende.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFeature {
    Column(&'static str),
    Relation(&'static str),
}

#[derive(Debug, PartialEq)]
pub enum Probe<T> {
    Supported(T),
    MissingColumn(&'static str),
    MissingRelation(&'static str),
}

impl SchemaFeature {
    fn is_missing_in(self, code: Option<&str>, message: &str) -> bool {
        let message = message.to_lowercase();
        match self {
            SchemaFeature::Column(column) => {
                code == Some(UNDEFINED_COLUMN) && message.contains(&column.to_lowercase())
            }
            SchemaFeature::Relation(relation) => {
                code == Some(UNDEFINED_TABLE) && message.contains(&relation.to_lowercase())
            }
        }
    }
}

fn classify(error: &dyn DatabaseError, optional: &[SchemaFeature]) -> Option<SchemaFeature> {
    let code = error.code();
    optional
        .iter()
        .copied()
        .find(|feature| feature.is_missing_in(code.as_deref(), error.message()))
}

/// Converte o resultado de uma consulta em `Probe`. Só os erros de
/// coluna/tabela inexistente listados em `optional` são absorvidos.
pub(crate) fn probe<T>(
    result: Result<T, sqlx::Error>,
    optional: &[SchemaFeature],
) -> Result<Probe<T>, AppError> {
    match result {
        Ok(value) => Ok(Probe::Supported(value)),
        Err(sqlx::Error::Database(db_err)) => match classify(db_err.as_ref(), optional) {
            Some(SchemaFeature::Column(column)) => {
                tracing::warn!(column, "Coluna ausente no schema, usando consulta reduzida");
                Ok(Probe::MissingColumn(column))
            }
            Some(SchemaFeature::Relation(relation)) => {
                tracing::warn!(relation, "Tabela ausente no schema, usando consulta reduzida");
                Ok(Probe::MissingRelation(relation))
            }
            None => Err(AppError::DatabaseError(sqlx::Error::Database(db_err))),
        },
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sqlx::error::ErrorKind;
    use std::borrow::Cow;
    use std::fmt;

    // Erro de banco falso, no formato que o driver do Postgres entrega.
    #[derive(Debug)]
    pub(crate) struct FakePgError {
        pub code: &'static str,
        pub message: String,
    }

    impl fmt::Display for FakePgError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for FakePgError {}

    impl DatabaseError for FakePgError {
        fn message(&self) -> &str {
            &self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    pub(crate) fn pg_error(code: &'static str, message: &str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakePgError {
            code,
            message: message.to_string(),
        }))
    }

    #[test]
    fn missing_column_is_absorbed() {
        let result: Result<Vec<u8>, _> =
            Err(pg_error("42703", "column gear.updated_at does not exist"));
        let probed = probe(result, &[SchemaFeature::Column("updated_at")]).unwrap();
        assert_eq!(probed, Probe::MissingColumn("updated_at"));
    }

    #[test]
    fn missing_relation_matches_case_insensitively() {
        let result: Result<(), _> = Err(pg_error(
            "42P01",
            "relation \"public.Gear_Status_History\" does not exist",
        ));
        let probed = probe(result, &[SchemaFeature::Relation("gear_status_history")]).unwrap();
        assert_eq!(probed, Probe::MissingRelation("gear_status_history"));
    }

    #[test]
    fn other_columns_are_still_fatal() {
        let result: Result<(), _> = Err(pg_error("42703", "column gear.colour does not exist"));
        assert_matches!(
            probe(result, &[SchemaFeature::Column("updated_at")]),
            Err(AppError::DatabaseError(sqlx::Error::Database(_)))
        );
    }

    #[test]
    fn code_must_match_the_feature_kind() {
        let result: Result<(), _> = Err(pg_error("42P01", "relation updated_at does not exist"));
        assert_matches!(
            probe(result, &[SchemaFeature::Column("updated_at")]),
            Err(AppError::DatabaseError(_))
        );
    }

    #[test]
    fn non_database_errors_pass_through() {
        let result: Result<(), _> = Err(sqlx::Error::PoolTimedOut);
        assert_matches!(
            probe(result, &[SchemaFeature::Column("updated_at")]),
            Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
        );
    }

    #[test]
    fn success_is_supported() {
        let probed = probe(Ok(3), &[SchemaFeature::Column("updated_at")]).unwrap();
        assert_eq!(probed, Probe::Supported(3));
    }
}
