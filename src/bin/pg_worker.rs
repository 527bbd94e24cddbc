//! Runs one embedded `PostgreSQL` lifecycle step on behalf of a root test run.
//!
//! ```text
//! pg_worker <setup|start|stop> <payload-path>
//! ```
//!
//! The payload is the JSON [`WorkerPayload`] written by
//! `pg-embed-setup-unpriv`: cluster settings plus environment overrides. When
//! started as root the worker re-executes itself as `nobody`, because
//! `PostgreSQL` refuses to run with superuser credentials.

#[cfg(unix)]
mod unix {
    use camino::{Utf8Path, Utf8PathBuf};
    use nix::unistd::{Uid, User, initgroups, setgid, setuid};
    use pg_embedded_setup_unpriv::ambient_dir_and_path;
    use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
    use postgresql_embedded::{PostgreSQL, Status};
    use std::env;
    use std::ffi::CString;
    use std::io::{self, Read};
    use std::process::{Command, ExitStatus};
    use thiserror::Error;

    pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

    const REEXEC_MARKER: &str = "PG_WORKER_REEXEC";
    const TRUSTED_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
    const UNPRIVILEGED_USER: &str = "nobody";

    #[derive(Debug, Error)]
    pub enum WorkerError {
        #[error("invalid arguments: {0}")]
        Usage(String),
        #[error("failed to read worker payload: {0}")]
        PayloadRead(#[source] BoxError),
        #[error("failed to parse worker payload: {0}")]
        PayloadParse(#[source] serde_json::Error),
        #[error("invalid cluster settings: {0}")]
        Settings(String),
        #[error("failed to build runtime: {0}")]
        Runtime(#[source] io::Error),
        #[error("failed to drop privileges: {0}")]
        Privileges(String),
        #[error("postgres {step} failed: {message}")]
        Postgres { step: &'static str, message: String },
    }

    /// Lifecycle step requested by the test harness.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Lifecycle {
        Setup,
        Start,
        Stop,
    }

    impl Lifecycle {
        pub fn parse(raw: &str) -> Result<Self, WorkerError> {
            match raw {
                "setup" => Ok(Self::Setup),
                "start" => Ok(Self::Start),
                "stop" => Ok(Self::Stop),
                other => Err(WorkerError::Usage(format!(
                    "unknown step '{other}'; expected setup, start, or stop"
                ))),
            }
        }
    }

    pub fn main() -> Result<(), BoxError> {
        let args = env::args_os()
            .map(|arg| {
                arg.into_string()
                    .map(Utf8PathBuf::from)
                    .map_err(|_| WorkerError::Usage("argument is not valid UTF-8".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        reexec_unprivileged(&args)?;
        let (step, payload_path) = parse_args(args.into_iter())?;
        run(step, &payload_path).map_err(Into::into)
    }

    pub fn parse_args(
        mut args: impl Iterator<Item = Utf8PathBuf>,
    ) -> Result<(Lifecycle, Utf8PathBuf), WorkerError> {
        let _program = args.next();
        let step = args
            .next()
            .ok_or_else(|| WorkerError::Usage("missing lifecycle step".into()))?;
        let step = Lifecycle::parse(step.as_str())?;
        let payload = args
            .next()
            .ok_or_else(|| WorkerError::Usage("missing payload path".into()))?;
        if let Some(extra) = args.next() {
            return Err(WorkerError::Usage(format!("unexpected argument: {extra}")));
        }
        Ok((step, payload))
    }

    fn run(step: Lifecycle, payload_path: &Utf8Path) -> Result<(), WorkerError> {
        let payload = load_payload(payload_path)?;
        drop_privileges()?;
        let settings = payload
            .settings
            .into_settings()
            .map_err(|err| WorkerError::Settings(err.to_string()))?;
        apply_environment(&payload.environment);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerError::Runtime)?;
        let mut postgres = PostgreSQL::new(settings);
        runtime.block_on(async {
            match step {
                Lifecycle::Setup => {
                    postgres
                        .setup()
                        .await
                        .map_err(|err| postgres_failure("setup", &err))?;
                    ensure_started(&mut postgres).await
                }
                Lifecycle::Start => ensure_started(&mut postgres).await,
                Lifecycle::Stop => postgres
                    .stop()
                    .await
                    .map_err(|err| postgres_failure("stop", &err)),
            }
        })?;

        if step != Lifecycle::Stop {
            // The server must outlive this process.
            let _running = std::mem::ManuallyDrop::new(postgres);
        }
        Ok(())
    }

    async fn ensure_started(postgres: &mut PostgreSQL) -> Result<(), WorkerError> {
        if matches!(postgres.status(), Status::Started) {
            return Ok(());
        }
        postgres
            .start()
            .await
            .map_err(|err| postgres_failure("start", &err))
    }

    fn postgres_failure(step: &'static str, err: &impl std::fmt::Display) -> WorkerError {
        WorkerError::Postgres {
            step,
            message: err.to_string(),
        }
    }

    fn load_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerError> {
        let read = || -> Result<Vec<u8>, BoxError> {
            let (dir, relative) = ambient_dir_and_path(path)?;
            let mut bytes = Vec::new();
            dir.open(relative.as_std_path())?.read_to_end(&mut bytes)?;
            Ok(bytes)
        };
        let bytes = read().map_err(WorkerError::PayloadRead)?;
        serde_json::from_slice(&bytes).map_err(WorkerError::PayloadParse)
    }

    fn reexec_unprivileged(args: &[Utf8PathBuf]) -> Result<(), WorkerError> {
        if !Uid::effective().is_root() || env::var_os(REEXEC_MARKER).is_some() {
            return Ok(());
        }

        let exe = env::current_exe()
            .map_err(WorkerError::Runtime)?
            .into_os_string()
            .into_string()
            .map(Utf8PathBuf::from)
            .map_err(|_| WorkerError::Runtime(io::Error::other("executable path is not UTF-8")))?;
        let forwarded = args.get(1..).unwrap_or_default();
        let status = match Command::new("runuser")
            .args(["-u", UNPRIVILEGED_USER, "--"])
            .arg(exe.as_std_path())
            .args(forwarded.iter().map(|arg| arg.as_std_path()))
            .env(REEXEC_MARKER, "1")
            .env("PATH", TRUSTED_PATH)
            .status()
        {
            Ok(status) => status,
            Err(err) if err.kind() == io::ErrorKind::NotFound => reexec_via_su(&exe, forwarded)?,
            Err(err) => return Err(WorkerError::Privileges(err.to_string())),
        };
        std::process::exit(status.code().unwrap_or(1));
    }

    fn reexec_via_su(exe: &Utf8Path, forwarded: &[Utf8PathBuf]) -> Result<ExitStatus, WorkerError> {
        let command = std::iter::once(exe.as_str())
            .chain(forwarded.iter().map(Utf8PathBuf::as_path).map(Utf8Path::as_str))
            .map(shell_quote)
            .fold(format!("{REEXEC_MARKER}=1 exec"), |mut command, word| {
                command.push(' ');
                command.push_str(&word);
                command
            });
        Command::new("/bin/su")
            .args(["-s", "/bin/sh", UNPRIVILEGED_USER, "-c"])
            .arg(command)
            .env("PATH", TRUSTED_PATH)
            .status()
            .map_err(|err| WorkerError::Privileges(err.to_string()))
    }

    /// Wraps `value` in single quotes for `sh -c`.
    pub fn shell_quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "'\\''"))
    }

    fn drop_privileges() -> Result<(), WorkerError> {
        if !Uid::effective().is_root() {
            return Ok(());
        }
        let privileges = |err: &dyn std::fmt::Display| WorkerError::Privileges(err.to_string());
        let user = User::from_name(UNPRIVILEGED_USER)
            .map_err(|err| privileges(&err))?
            .ok_or_else(|| {
                WorkerError::Privileges(format!("user '{UNPRIVILEGED_USER}' not found"))
            })?;
        let name = CString::new(user.name.clone()).map_err(|err| privileges(&err))?;
        initgroups(&name, user.gid).map_err(|err| privileges(&err))?;
        setgid(user.gid).map_err(|err| privileges(&err))?;
        setuid(user.uid).map_err(|err| privileges(&err))?;

        // SAFETY: the worker is single-threaded at this point.
        unsafe {
            env::set_var("HOME", user.dir);
            env::set_var("USER", &user.name);
            env::set_var("LOGNAME", &user.name);
        }
        Ok(())
    }

    fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
        for (key, value) in environment {
            // SAFETY: the worker is single-threaded and owns its environment.
            unsafe {
                match value {
                    Some(secret) => env::set_var(key, secret.expose()),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

#[cfg(unix)]
fn main() -> Result<(), unix::BoxError> {
    unix::main()
}

#[cfg(not(unix))]
fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    Err("pg_worker is only supported on Unix platforms".into())
}
