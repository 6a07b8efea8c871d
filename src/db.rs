// src/db.rs
use crate::config::DatabaseConfig;
use crate::error::IsinError;
use crate::types::IdentifierRecord;
use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use std::sync::OnceLock;
use tiberius::{AuthMethod, Client, ColumnData, Config, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Maximum number of rows a single fetch returns.
pub const RESULT_LIMIT: usize = 10;
/// `IdentifierType` value for ISINs in the identifier table.
pub const ISIN_IDENTIFIER_TYPE: i32 = 2;

static TABLE_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

/// SQL text plus the identifiers bound to its positional placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierQuery {
    sql: String,
    params: Vec<String>,
}

impl IdentifierQuery {
    /// Builds the lookup query for `ids`. Identifiers are only ever bound as
    /// parameters; the table name is validated because it can't be.
    pub fn build<S: AsRef<str>>(table_name: &str, ids: &[S]) -> Result<Self, IsinError> {
        if ids.is_empty() {
            return Err(IsinError::EmptyIdentifiers);
        }
        validate_table_name(table_name)?;

        let placeholders = (1..=ids.len())
            .map(|i| format!("@P{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "SELECT TOP {} InvestmentId, ExchangeId, RIGHT(CurrencyId, 3), Identifier FROM {} WHERE IdentifierType = {} AND Identifier IN ({})",
            RESULT_LIMIT, table_name, ISIN_IDENTIFIER_TYPE, placeholders
        );

        Ok(Self {
            sql,
            params: ids.iter().map(|id| id.as_ref().to_string()).collect(),
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn placeholder_count(&self) -> usize {
        self.params.len()
    }
}

/// Accepts `Table`, `schema.Table`, `db.schema.Table`, with optional `[bracketed]` parts.
pub fn validate_table_name(name: &str) -> Result<(), IsinError> {
    let regex = TABLE_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^(\[[^\[\]]+\]|[A-Za-z_][A-Za-z0-9_]*)(\.(\[[^\[\]]+\]|[A-Za-z_][A-Za-z0-9_]*)){0,2}$").unwrap()
    });
    if regex.is_match(name) {
        Ok(())
    } else {
        Err(IsinError::InvalidTableName(name.to_string()))
    }
}

/// Something that can run an [`IdentifierQuery`] and hand back decoded rows.
#[async_trait]
pub trait IdentifierSource {
    async fn execute(&mut self, query: &IdentifierQuery) -> Result<Vec<IdentifierRecord>, IsinError>;

    /// Releases the underlying connection. Called once, after the query, on every path.
    async fn close(&mut self) {}
}

/// Runs `query` against `source`, enforcing the row cap.
pub async fn fetch_with<S>(source: &mut S, query: &IdentifierQuery) -> Result<Vec<IdentifierRecord>, IsinError>
where
    S: IdentifierSource + Send + ?Sized,
{
    info!("Executing SQL: {}", query.sql());
    info!("With parameters: {:?}", query.params());

    let mut rows = source.execute(query).await?;
    if rows.len() > RESULT_LIMIT {
        warn!("Source returned {} rows, keeping the first {}", rows.len(), RESULT_LIMIT);
        rows.truncate(RESULT_LIMIT);
    }

    info!("Retrieved {} rows.", rows.len());
    Ok(rows)
}

/// Runs `query` and closes `source` afterwards, whether the query succeeded or not.
pub async fn fetch_then_close<S>(source: &mut S, query: &IdentifierQuery) -> Result<Vec<IdentifierRecord>, IsinError>
where
    S: IdentifierSource + Send + ?Sized,
{
    let result = fetch_with(source, query).await;
    source.close().await;
    result
}

/// Looks up `ids` in the configured identifier table.
///
/// The query is validated before any connection is opened. Once open, the
/// connection is closed whether the query succeeds or fails.
pub async fn fetch_identifiers<S: AsRef<str>>(
    config: &DatabaseConfig,
    ids: &[S],
) -> Result<Vec<IdentifierRecord>, IsinError> {
    let query = IdentifierQuery::build(&config.table_name, ids)?;

    let mut source = SqlServerSource::connect(config).await?;
    fetch_then_close(&mut source, &query).await
}

/// A single SQL Server connection over TDS.
pub struct SqlServerSource {
    client: Option<Client<Compat<TcpStream>>>,
}

impl SqlServerSource {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, IsinError> {
        debug!("Connecting with {}", config.display_connection_string());

        let mut tds = Config::new();
        tds.host(&config.server);
        tds.port(config.port);
        tds.database(&config.database);
        tds.authentication(AuthMethod::sql_server(&config.username, &config.password));
        if config.trust_cert {
            tds.trust_cert();
        }

        let tcp = TcpStream::connect(tds.get_addr())
            .await
            .map_err(|e| IsinError::Connection(format!("{}:{}: {}", config.server, config.port, e)))?;
        tcp.set_nodelay(true)
            .map_err(|e| IsinError::Connection(e.to_string()))?;

        let client = Client::connect(tds, tcp.compat_write())
            .await
            .map_err(|e| IsinError::Connection(e.to_string()))?;

        info!("Connection established successfully using SQL Auth!");
        Ok(Self { client: Some(client) })
    }
}

#[async_trait]
impl IdentifierSource for SqlServerSource {
    async fn execute(&mut self, query: &IdentifierQuery) -> Result<Vec<IdentifierRecord>, IsinError> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| IsinError::Query("connection already closed".to_string()))?;

        let mut select = Query::new(query.sql());
        for id in query.params() {
            select.bind(id.as_str());
        }

        let rows = select
            .query(client)
            .await
            .map_err(|e| IsinError::Query(e.to_string()))?
            .into_first_result()
            .await
            .map_err(|e| IsinError::Query(e.to_string()))?;

        rows.into_iter().map(decode_row).collect()
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            match client.close().await {
                Ok(()) => info!("Connection closed."),
                Err(e) => warn!("Connection closed with error: {}", e),
            }
        }
    }
}

fn decode_row(row: Row) -> Result<IdentifierRecord, IsinError> {
    let mut cells = row.into_iter();
    let mut next = |name: &str| {
        cells
            .next()
            .ok_or_else(|| IsinError::Query(format!("result row is missing column {}", name)))
    };

    let investment_id = column_text("InvestmentId", next("InvestmentId")?)?;
    let exchange_id = column_integer("ExchangeId", next("ExchangeId")?)?;
    let currency = column_text("Currency", next("Currency")?)?;
    let identifier = column_text("Identifier", next("Identifier")?)?
        .ok_or_else(|| IsinError::Query("Identifier is null".to_string()))?;

    Ok(IdentifierRecord {
        investment_id,
        exchange_id,
        currency,
        identifier,
    })
}

fn column_text(name: &str, data: ColumnData<'static>) -> Result<Option<String>, IsinError> {
    let text = match data {
        ColumnData::String(v) => v.map(|s| s.into_owned()),
        ColumnData::Guid(v) => v.map(|g| g.to_string()),
        ColumnData::U8(v) => v.map(|n| n.to_string()),
        ColumnData::I16(v) => v.map(|n| n.to_string()),
        ColumnData::I32(v) => v.map(|n| n.to_string()),
        ColumnData::I64(v) => v.map(|n| n.to_string()),
        ColumnData::F32(v) => v.map(|n| n.to_string()),
        ColumnData::F64(v) => v.map(|n| n.to_string()),
        ColumnData::Bit(v) => v.map(|b| b.to_string()),
        ColumnData::Numeric(v) => v.map(|n| n.to_string()),
        other => {
            return Err(IsinError::UnsupportedColumn {
                column: name.to_string(),
                kind: format!("{:?}", other),
            })
        }
    };
    Ok(text)
}

fn column_integer(name: &str, data: ColumnData<'static>) -> Result<Option<i64>, IsinError> {
    let value = match data {
        ColumnData::U8(v) => v.map(i64::from),
        ColumnData::I16(v) => v.map(i64::from),
        ColumnData::I32(v) => v.map(i64::from),
        ColumnData::I64(v) => v,
        ColumnData::F32(v) => v.and_then(|f| whole_number(name, f64::from(f))),
        ColumnData::F64(v) => v.and_then(|f| whole_number(name, f)),
        ColumnData::Numeric(v) => v.and_then(|n| {
            let unit = 10i128.checked_pow(u32::from(n.scale()))?;
            if n.value() % unit == 0 {
                i64::try_from(n.value() / unit).ok()
            } else {
                warn!("{} value {} is not a whole number; treating as null", name, n);
                None
            }
        }),
        other => column_text(name, other)?.and_then(|s| {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(|f| whole_number(name, f)))
        }),
    };
    Ok(value)
}

fn whole_number(name: &str, f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        warn!("{} value {} is not a whole number; treating as null", name, f);
        None
    }
}
