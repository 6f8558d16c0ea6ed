//! Run SQL statements through the multiplexer and print what comes back.

use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::Level;

use sql_multiplex::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run SQL over a poll-driven PostgreSQL connection pool")]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 5432)]
    port: u16,
    #[arg(long, short = 'U')]
    user: String,
    /// Falls back to $PGPASSWORD
    #[arg(long)]
    password: Option<String>,
    #[arg(long, short = 'd')]
    dbname: String,
    #[arg(long, default_value_t = 4)]
    pool_size: i64,
    #[arg(long, value_parser = humantime::parse_duration, default_value = "50ms")]
    poll_timeout: Duration,
    /// Give up if the statements have not finished by then
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    deadline: Duration,
    /// Wrap all statements into one BEGIN/COMMIT request
    #[arg(long)]
    transaction: bool,
    #[arg(long, short = 'v')]
    verbose: bool,
    /// Statements to run; each one becomes its own request
    #[arg(required = true)]
    sql: Vec<String>,
}

#[derive(Default)]
struct Outcome {
    failures: usize,
}

fn print_result(request: usize, rs: &QueryResult, index: usize) {
    if rs.status() == ResultStatus::CommandOk {
        println!("[{request}.{index}] ok ({} rows affected)", rs.rows_affected());
        return;
    }
    println!("[{request}.{index}] {}", rs.column_names().join(" | "));
    for row in rs.rows() {
        let cells: Vec<&str> = (0..rs.n_columns())
            .map(|col| row.get_by_index(col).unwrap_or("NULL"))
            .collect();
        println!("[{request}.{index}] {}", cells.join(" | "));
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let password = args
        .password
        .clone()
        .or_else(|| std::env::var("PGPASSWORD").ok())
        .unwrap_or_default();
    let config = MultiplexConfig::new(
        args.user.clone(),
        password,
        args.dbname.clone(),
        args.host.clone(),
        args.port,
        args.pool_size,
    )
    .with_poll_timeout(args.poll_timeout);

    match run(&args, config) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("sqlmux: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: MultiplexConfig) -> Result<usize, SqlMultiplexError> {
    let mut mux = Multiplexer::new(PgConnector::new()?, config)?;
    let outcome = Rc::new(RefCell::new(Outcome::default()));

    let statements: Vec<String> = if args.transaction {
        vec![args.sql.iter().map(|s| format!("{s};\n")).collect()]
    } else {
        args.sql.clone()
    };

    for (request, sql) in statements.into_iter().enumerate() {
        let failed = Rc::clone(&outcome);
        let h = handler(
            move |rs: &QueryResult, index| {
                print_result(request, rs, index);
                true
            },
            move |msg: &str, index, _sql: &str| {
                eprintln!("[{request}.{index}] {}", msg.trim_end());
                failed.borrow_mut().failures += 1;
            },
        );
        let id = if args.transaction {
            mux.submit_transaction(&sql, h)
        } else {
            mux.submit(sql, h)
        };
        if id == 0 {
            return Err(SqlMultiplexError::Other(format!(
                "statement {request} was rejected"
            )));
        }
    }

    let started = Instant::now();
    let mut last_reported = String::new();
    while mux.pending_count() > 0 {
        if started.elapsed() > args.deadline {
            return Err(SqlMultiplexError::Other(format!(
                "{} request(s) still pending after {}",
                mux.pending_count(),
                humantime::format_duration(args.deadline)
            )));
        }
        if mux.touch().is_error() && mux.get_error() != last_reported {
            last_reported = mux.get_error().to_string();
            tracing::warn!(error = %last_reported, "connection problem, retrying");
        }
    }

    let failures = outcome.borrow().failures;
    Ok(failures)
}
