use std::future::Future;
use std::time::Instant;

use irhabi_core::AppError;

/// Run a database operation and log its outcome.
///
/// Each call emits one event with `operation`, `query`, `latency` (ms) and an
/// `outcome` of `OK` or `FAIL`.
pub async fn logged<T, F>(operation: &str, sql: &str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let started = Instant::now();
    let result = fut.await;
    let latency = format!("{:.1}ms", started.elapsed().as_secs_f64() * 1000.0);

    match &result {
        Ok(_) => tracing::debug!(
            operation,
            outcome = "OK",
            latency = %latency,
            query = %sql,
            "Success"
        ),
        Err(e) => tracing::error!(
            operation,
            outcome = "FAIL",
            latency = %latency,
            query = %sql,
            error = %e,
            "Query failed"
        ),
    }

    result.map_err(into_app_error)
}

/// Map a sqlx error onto [`AppError`]. Missing rows become `DataNotExists`.
pub fn into_app_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::RowNotFound => AppError::not_exists("id", "The record is not exists."),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::exists("id", db.message().to_string())
        }
        other => AppError::Database(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn events(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn subscriber(out: Captured) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || out.clone())
            .finish()
    }

    #[tokio::test]
    async fn test_logs_operation_field() {
        let out = Captured::default();
        let _guard = tracing::subscriber::set_default(subscriber(out.clone()));

        let ok = logged("select", "SELECT 1", async { Ok::<_, sqlx::Error>(1) }).await;
        assert_eq!(ok.unwrap(), 1);

        let err = logged("update", "UPDATE t", async { Err::<(), _>(sqlx::Error::RowNotFound) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataNotExists { .. }));

        let events = out.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["fields"]["operation"], "select");
        assert_eq!(events[0]["fields"]["outcome"], "OK");
        assert_eq!(events[0]["fields"]["query"], "SELECT 1");
        assert_eq!(events[1]["fields"]["operation"], "update");
        assert_eq!(events[1]["fields"]["outcome"], "FAIL");
        assert_eq!(events[1]["level"], "ERROR");
    }
}
