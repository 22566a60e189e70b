//!
//! freelance CLI binary
//! --------------------
//! Command-line shell over the dashboard API. Bootstraps the session (or logs in with
//! the given credentials) and either runs a one-shot GET or starts an interactive
//! interpreter where every call goes through the authenticated pipeline.

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use freelance_client::navigation::TracingNavigator;
use freelance_client::{ApiClient, ClientConfig, RequestOptions, ReqwestTransport, SessionManager};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--url <base>] [--email <e>] [--password <p>] [--get <path>]\n  {program} --repl [--url <base>] [--email <e>] [--password <p>]\n\nFlags:\n  --url <base>         Backend base URL (default: $FREELANCE_API_URL or http://127.0.0.1:5000)\n  --email <e>          Log in with this email before running\n  --password <p>       Password for --email\n  --get <path>         One-shot GET through the authenticated pipeline\n  --timeout-ms <ms>    Deadline for every request\n  --repl               Start interactive mode\n  -h, --help           Show this help\n\nInteractive commands:\n  login <email> <password>   authenticate; prints the landing route\n  logout                     end the session (always succeeds locally)\n  whoami                     show the current identity\n  status                     show session phase, loading flag and CSRF token presence\n  get <path>                 GET a path\n  post <path> [json]         POST a JSON body\n  put <path> <json>          PUT a JSON body\n  delete <path>              DELETE a path\n  help                       show this help\n  quit | exit                exit the interpreter"
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config = ClientConfig::from_env();
    let mut email: Option<String> = None;
    let mut password: Option<String> = None;
    let mut get_path: Option<String> = None;
    let mut repl = false;

    let mut i = 0;
    while i < args.len() {
        let needs_value = |i: usize| {
            if i + 1 >= args.len() { eprintln!("{} requires a value", args[i]); print_usage(&program); std::process::exit(2); }
        };
        match args[i].as_str() {
            "--url" => { needs_value(i); config.base_url = args[i + 1].clone(); i += 2; }
            "--email" => { needs_value(i); email = Some(args[i + 1].clone()); i += 2; }
            "--password" => { needs_value(i); password = Some(args[i + 1].clone()); i += 2; }
            "--get" => { needs_value(i); get_path = Some(args[i + 1].clone()); i += 2; }
            "--timeout-ms" => {
                needs_value(i);
                config.request_timeout_ms = Some(args[i + 1].parse().context("--timeout-ms expects milliseconds")?);
                i += 2;
            }
            "--repl" => { repl = true; i += 1; }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            unk => { eprintln!("Unrecognized argument: {}", unk); print_usage(&program); std::process::exit(2); }
        }
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let transport = ReqwestTransport::new(&config).with_context(|| format!("invalid backend URL '{}'", config.base_url))?;
    let client = ApiClient::new(config, Arc::new(transport));
    let session = SessionManager::new(client, Arc::new(TracingNavigator));

    rt.block_on(async {
        match (email.as_deref(), password.as_deref()) {
            (Some(e), Some(p)) => {
                if let Err(err) = session.login(e, p).await { eprintln!("login failed: {}", err); std::process::exit(1); }
            }
            (None, None) => session.initialize().await,
            _ => { eprintln!("--email and --password must be given together"); std::process::exit(2); }
        }
    });

    if repl {
        return run_repl(rt, session);
    }

    let Some(path) = get_path else {
        print_identity(&session);
        return Ok(());
    };
    match rt.block_on(async { session.call(&path, RequestOptions::get()).await }) {
        Ok(val) => { print_json(&val); Ok(()) }
        Err(err) => { eprintln!("Error: {}", err); std::process::exit(1); }
    }
}

fn run_repl(rt: tokio::runtime::Runtime, session: SessionManager) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    println!("freelance-cli interpreter. Type 'help' for commands.");
    loop {
        input.clear();
        print!("> "); let _ = stdout.flush();
        match stdin.read_line(&mut input) { Ok(0) | Err(_) => break, Ok(_) => {} }
        let line = input.trim();
        if line.is_empty() { continue; }
        let (cmd, rest) = line.split_once(char::is_whitespace).map(|(c, r)| (c, r.trim())).unwrap_or((line, ""));
        match cmd.to_ascii_lowercase().as_str() {
            "quit" | "exit" => break,
            "help" => print_usage("freelance_cli"),
            "login" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                if parts.len() != 2 { eprintln!("usage: login <email> <password>"); continue; }
                match rt.block_on(async { session.login(parts[0], parts[1]).await }) {
                    Ok(identity) => println!("logged in as {} ({})", identity.email, identity.role),
                    Err(e) => eprintln!("login failed: {}", e),
                }
            }
            "logout" => { rt.block_on(async { session.logout().await }); println!("logged out"); }
            "whoami" => print_identity(&session),
            "status" => {
                let snap = session.snapshot();
                println!("phase: {:?}", snap.phase);
                println!("loading: {}", snap.loading);
                println!("csrf token: {}", if session.client().current_token().is_some() { "present" } else { "absent" });
            }
            "get" | "delete" | "post" | "put" => {
                let (path, body) = rest.split_once(char::is_whitespace).map(|(p, b)| (p, b.trim())).unwrap_or((rest, ""));
                if path.is_empty() { eprintln!("usage: {} <path> [json]", cmd); continue; }
                let body = if body.is_empty() { None } else {
                    match serde_json::from_str::<serde_json::Value>(body) {
                        Ok(v) => Some(v),
                        Err(e) => { eprintln!("invalid JSON body: {}", e); continue; }
                    }
                };
                let options = match cmd.to_ascii_lowercase().as_str() {
                    "get" => RequestOptions::get(),
                    "delete" => RequestOptions::delete(),
                    "post" => RequestOptions::post(body),
                    _ => match body {
                        Some(b) => RequestOptions::put(b),
                        None => { eprintln!("usage: put <path> <json>"); continue; }
                    },
                };
                match rt.block_on(async { session.call(path, options).await }) {
                    Ok(v) => print_json(&v),
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            other => eprintln!("unknown command '{}'; type 'help'", other),
        }
    }
    Ok(())
}

fn print_identity(session: &SessionManager) {
    match session.identity() {
        Some(identity) => print_json(&serde_json::to_value(&identity).unwrap_or_default()),
        None => println!("not logged in"),
    }
}

fn print_json(val: &serde_json::Value) {
    let s = serde_json::to_string_pretty(val).unwrap_or_else(|_| val.to_string());
    println!("{}", s);
}
