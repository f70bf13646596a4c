//! Engine backed by an external helper program.
//!
//! The helper (typically a PyXspec script) is launched once per model with
//! `{placeholder}` arguments filled in from the request. Path placeholders
//! are absolute and the helper runs in the launch directory, so relative
//! Targets and a relative script path both work. It is expected to leave
//! `<model>_xspec.log`, `<model>_spec.csv` and `<model>_ratio.csv` in the
//! output directory; its own stdout and stderr go to `<model>_engine.out`
//! next to them. Artifacts left over from an earlier run are removed before
//! the helper starts.

use std::fs::{self, File};
use std::io;
use std::path::{self, Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::domain::ModelKind;
use crate::engine::{FitArtifacts, FitEngine, FitRequest, FitSession};
use crate::error::EngineError;

pub const SPECTRUM_COLUMNS: [&str; 4] = ["xVals", "yVals", "yErrs", "modVals"];
pub const RATIO_COLUMNS: [&str; 3] = ["xVals", "yVals", "yErrs"];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct CommandEngine {
    config: EngineConfig,
}

impl CommandEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl FitEngine for CommandEngine {
    type Session = CommandSession;

    fn open(&mut self, request: &FitRequest) -> Result<CommandSession, EngineError> {
        let request = absolute_request(request)?;
        let args = self
            .config
            .args
            .iter()
            .map(|arg| substitute(arg, &request))
            .collect();
        tracing::debug!(
            program = %self.config.program,
            model = %request.model,
            outdir = %request.outdir.display(),
            "opening engine session"
        );
        Ok(CommandSession {
            program: self.config.program.clone(),
            args,
            timeout: self.config.timeout_secs.map(Duration::from_secs),
            request,
            stage: Stage::Opened,
            child: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Opened,
    Loaded,
    Fitted,
    Exported,
    Closed,
}

#[derive(Debug)]
pub struct CommandSession {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    request: FitRequest,
    stage: Stage,
    child: Option<Child>,
}

impl CommandSession {
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Where the helper's console output is captured.
    pub fn console_path(&self) -> PathBuf {
        self.request
            .outdir
            .join(format!("{}_engine.out", self.request.model.name()))
    }

    fn expect_stage(&self, expected: Stage, stage: &'static str) -> Result<(), EngineError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(EngineError::Stage { stage })
        }
    }

    fn wait(&mut self) -> Result<ExitStatus, EngineError> {
        let started = Instant::now();
        loop {
            let Some(child) = self.child.as_mut() else {
                return Err(EngineError::Stage { stage: "wait" });
            };
            if let Some(status) = child.try_wait()? {
                self.child = None;
                return Ok(status);
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    self.kill_child();
                    return Err(EngineError::Timeout {
                        secs: limit.as_secs(),
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::warn!(model = %self.request.model, "failed to kill engine process: {e}");
            }
            let _ = child.wait();
        }
    }
}

impl FitSession for CommandSession {
    fn load(&mut self) -> Result<(), EngineError> {
        self.expect_stage(Stage::Opened, "load")?;
        let inputs = &self.request.inputs;
        for path in [&inputs.spectrum, &inputs.response, &inputs.background]
            .into_iter()
            .chain(inputs.ancillary.as_ref())
        {
            if !path.is_file() {
                return Err(EngineError::MissingInput { path: path.clone() });
            }
        }
        self.stage = Stage::Loaded;
        Ok(())
    }

    fn fit(&mut self) -> Result<(), EngineError> {
        self.expect_stage(Stage::Loaded, "fit")?;
        let artifacts = FitArtifacts::expected(&self.request.outdir, self.request.model);
        for path in [&artifacts.log, &artifacts.spectrum_csv, &artifacts.ratio_csv] {
            remove_stale(path)?;
        }

        let console = File::create(self.console_path())?;
        let console_err = console.try_clone()?;
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(console))
            .stderr(Stdio::from(console_err))
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        tracing::debug!(model = %self.request.model, pid = child.id(), "engine process started");
        self.child = Some(child);

        let status = self.wait()?;
        if !status.success() {
            return Err(EngineError::Exit {
                status: status.to_string(),
            });
        }
        self.stage = Stage::Fitted;
        Ok(())
    }

    fn export(&mut self) -> Result<FitArtifacts, EngineError> {
        self.expect_stage(Stage::Fitted, "export")?;
        let artifacts = FitArtifacts::expected(&self.request.outdir, self.request.model);

        if !artifacts.log.is_file() {
            return Err(EngineError::MissingArtifact {
                path: artifacts.log.clone(),
            });
        }
        check_columns(&artifacts.spectrum_csv, &SPECTRUM_COLUMNS)?;
        check_columns(&artifacts.ratio_csv, &RATIO_COLUMNS)?;

        self.stage = Stage::Exported;
        Ok(artifacts)
    }

    fn close(&mut self) {
        if self.stage == Stage::Closed {
            return;
        }
        self.kill_child();
        tracing::debug!(model = %self.request.model, "engine session closed");
        self.stage = Stage::Closed;
    }
}

/// Copy of `request` with every path made absolute against the launch
/// directory.
fn absolute_request(request: &FitRequest) -> Result<FitRequest, EngineError> {
    let inputs = &request.inputs;
    let mut absolute = request.clone();
    absolute.inputs.spectrum = path::absolute(&inputs.spectrum)?;
    absolute.inputs.response = path::absolute(&inputs.response)?;
    absolute.inputs.background = path::absolute(&inputs.background)?;
    absolute.inputs.ancillary = inputs.ancillary.as_deref().map(path::absolute).transpose()?;
    absolute.outdir = path::absolute(&request.outdir)?;
    Ok(absolute)
}

fn remove_stale(path: &Path) -> Result<(), EngineError> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed artifact from an earlier run");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Fill `{placeholder}`s in one argument. Unset optional values become
/// empty strings; unknown placeholders are left as written.
pub fn substitute(arg: &str, request: &FitRequest) -> String {
    let inputs = &request.inputs;
    let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    let pairs = [
        ("{spectrum}", inputs.spectrum.display().to_string()),
        ("{response}", inputs.response.display().to_string()),
        ("{background}", inputs.background.display().to_string()),
        (
            "{ancillary}",
            inputs
                .ancillary
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        ),
        ("{outdir}", request.outdir.display().to_string()),
        ("{model}", request.model.name().to_string()),
        ("{expression}", request.model.expression().to_string()),
        ("{nh}", request.fit.nh.to_string()),
        ("{emin}", request.fit.energy_min.to_string()),
        ("{emax}", request.fit.energy_max.to_string()),
        ("{iterations}", request.fit.iterations.to_string()),
        ("{flux_emin}", optional(request.flux.map(|b| b.energy_min))),
        ("{flux_emax}", optional(request.flux.map(|b| b.energy_max))),
        ("{initial}", initial_values(request.model)),
    ];

    let mut out = arg.to_string();
    for (key, value) in &pairs {
        if out.contains(key) {
            out = out.replace(key, value);
        }
    }
    out
}

/// `name=value` pairs for parameters with a starting value, comma separated.
pub fn initial_values(model: ModelKind) -> String {
    model
        .parameters()
        .iter()
        .filter_map(|p| p.initial.map(|v| format!("{}={v}", p.name)))
        .collect::<Vec<_>>()
        .join(",")
}

fn check_columns(path: &Path, expected: &[&str]) -> Result<(), EngineError> {
    if !path.is_file() {
        return Err(EngineError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let bad = |found: String| EngineError::BadArtifact {
        path: path.to_path_buf(),
        expected: expected.join(","),
        found,
    };

    let mut reader = csv::Reader::from_path(path).map_err(|e| bad(e.to_string()))?;
    let headers = reader.headers().map_err(|e| bad(e.to_string()))?;
    let found: Vec<&str> = headers.iter().map(str::trim).collect();
    if found != expected {
        return Err(bad(found.join(",")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::config::{FitSettings, FluxBand};
    use crate::domain::ResolvedInputs;
    use crate::engine::run_model;

    fn request_for(dir: &Path) -> FitRequest {
        FitRequest {
            inputs: ResolvedInputs {
                spectrum: dir.join("ni_src.pha"),
                response: dir.join("ni.rmf"),
                background: dir.join("ni_bkg.xcm"),
                ancillary: None,
            },
            outdir: dir.to_path_buf(),
            model: ModelKind::LogPar,
            fit: FitSettings::default(),
            flux: None,
        }
    }

    /// Request whose input files exist on disk.
    fn request_in(dir: &Path) -> FitRequest {
        let request = request_for(dir);
        let inputs = &request.inputs;
        for path in [&inputs.spectrum, &inputs.response, &inputs.background] {
            std::fs::write(path, "").unwrap();
        }
        request
    }

    fn shell_engine(script: &str, timeout_secs: Option<u64>) -> CommandEngine {
        CommandEngine::new(EngineConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            timeout_secs,
        })
    }

    const WRITE_ARTIFACTS: &str = "cd '{outdir}' || exit 9; echo fit done; \
        printf 'log\\n' > logpar_xspec.log; \
        printf 'xVals,yVals,yErrs,modVals\\n1.0,2.0,0.1,2.1\\n' > logpar_spec.csv; \
        printf 'xVals,yVals,yErrs\\n1.0,0.95,0.05\\n' > logpar_ratio.csv";

    #[test]
    fn placeholders_are_substituted() {
        let mut request = request_for(Path::new("/obs/42"));
        request.flux = Some(FluxBand {
            energy_min: 0.5,
            energy_max: 2.0,
        });
        assert_eq!(substitute("{model}", &request), "logpar");
        assert_eq!(substitute("{expression}", &request), "tbabs*logpar");
        assert_eq!(substitute("--nh={nh}", &request), "--nh=0.0131");
        assert_eq!(substitute("{emin}-{emax}", &request), "0.3-10");
        assert_eq!(substitute("{flux_emin}", &request), "0.5");
        assert_eq!(substitute("{ancillary}", &request), "");
        assert_eq!(substitute("{outdir}/x", &request), "/obs/42/x");
        assert_eq!(substitute("{initial}", &request), "alpha=1,beta=1");
        assert_eq!(substitute("{unknown}", &request), "{unknown}");
    }

    #[test]
    fn relative_paths_are_made_absolute() {
        let session = CommandEngine::new(EngineConfig {
            program: "helper".to_string(),
            args: vec!["{spectrum}".to_string(), "{outdir}".to_string()],
            timeout_secs: None,
        })
        .open(&request_for(Path::new("obs1")))
        .unwrap();

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(session.args(), [
            cwd.join("obs1").join("ni_src.pha").display().to_string(),
            cwd.join("obs1").display().to_string(),
        ]);
        assert_eq!(session.console_path(), cwd.join("obs1").join("logpar_engine.out"));
    }

    #[test]
    fn missing_input_fails_load() {
        let dir = TempDir::new().unwrap();
        let request = request_in(dir.path());
        std::fs::remove_file(&request.inputs.response).unwrap();

        let err = run_model(&mut shell_engine("true", None), &request).unwrap_err();
        assert!(matches!(err, EngineError::MissingInput { path } if path.ends_with("ni.rmf")));
    }

    #[test]
    fn fit_before_load_is_a_stage_error() {
        let dir = TempDir::new().unwrap();
        let mut session = shell_engine("true", None).open(&request_in(dir.path())).unwrap();
        assert!(matches!(session.fit(), Err(EngineError::Stage { stage: "fit" })));
        session.close();
    }

    #[cfg(unix)]
    #[test]
    fn helper_writing_artifacts_succeeds() {
        let dir = TempDir::new().unwrap();
        let request = request_in(dir.path());

        let artifacts = run_model(&mut shell_engine(WRITE_ARTIFACTS, Some(30)), &request).unwrap();
        assert_eq!(artifacts.log, dir.path().join("logpar_xspec.log"));

        let console = std::fs::read_to_string(dir.path().join("logpar_engine.out")).unwrap();
        assert!(console.contains("fit done"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_engine_failure() {
        let dir = TempDir::new().unwrap();
        let err = run_model(&mut shell_engine("exit 3", None), &request_in(dir.path())).unwrap_err();
        assert!(matches!(err, EngineError::Exit { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn hung_helper_is_killed_on_timeout() {
        let dir = TempDir::new().unwrap();
        let started = Instant::now();
        let err = run_model(&mut shell_engine("sleep 30", Some(1)), &request_in(dir.path())).unwrap_err();
        assert!(matches!(err, EngineError::Timeout { secs: 1 }));
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[cfg(unix)]
    #[test]
    fn wrong_plot_columns_are_rejected() {
        let dir = TempDir::new().unwrap();
        let script = "cd '{outdir}' || exit 9; printf 'log\\n' > logpar_xspec.log; \
            printf 'x,y\\n' > logpar_spec.csv; \
            printf 'xVals,yVals,yErrs\\n' > logpar_ratio.csv";
        let err = run_model(&mut shell_engine(script, None), &request_in(dir.path())).unwrap_err();
        match err {
            EngineError::BadArtifact { expected, found, .. } => {
                assert_eq!(expected, "xVals,yVals,yErrs,modVals");
                assert_eq!(found, "x,y");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn artifacts_from_an_earlier_run_are_not_reused() {
        let dir = TempDir::new().unwrap();
        let request = request_in(dir.path());
        let artifacts = FitArtifacts::expected(dir.path(), ModelKind::LogPar);
        std::fs::write(&artifacts.log, "old log\n").unwrap();
        std::fs::write(&artifacts.spectrum_csv, "xVals,yVals,yErrs,modVals\n").unwrap();
        std::fs::write(&artifacts.ratio_csv, "xVals,yVals,yErrs\n").unwrap();

        let err = run_model(&mut shell_engine("true", None), &request).unwrap_err();
        assert!(matches!(err, EngineError::MissingArtifact { path } if path.ends_with("logpar_xspec.log")));
        assert!(!artifacts.spectrum_csv.exists());
    }

    #[cfg(unix)]
    #[test]
    fn missing_log_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = run_model(&mut shell_engine("true", None), &request_in(dir.path())).unwrap_err();
        assert!(matches!(err, EngineError::MissingArtifact { path } if path.ends_with("logpar_xspec.log")));
    }
}
