use crate::args::AskParams;
use async_trait::async_trait;
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use sql_fetcher::cache;
use sql_fetcher::context::{Credential, CredentialName};
use sql_fetcher::engine::assistant::build_prompt;
use sql_fetcher::engine::{Assistant, GenerationServiceError, Session, TextGenerator};
use sql_fetcher::{ErrorKind, InternalError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const API_KEY_VARIABLE: &str = "SQL_FETCHER_API_KEY";
const GENERATOR_VARIABLE: &str = "SQL_FETCHER_GENERATOR";

/// Hands the prompt to an external program and reads its answer from stdout.
///
/// Talking to the actual text generation service is the program's job. We only pass it the
/// prompt, the API key and a deadline.
struct CommandGenerator {
    program: String,
    args: Vec<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl CommandGenerator {
    fn parse(command_line: &str, api_key: Option<String>, timeout: Duration) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;

        Some(CommandGenerator {
            program,
            args: parts.collect(),
            api_key,
            timeout,
        })
    }

    async fn run(&self, prompt: String) -> Result<String, GenerationServiceError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(api_key) = &self.api_key {
            command.env(API_KEY_VARIABLE, api_key);
        }

        let mut child = command.spawn().map_err(failed)?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| GenerationServiceError::Failed("no stdin for the generator".into()))?;

        let write_prompt = async move {
            stdin.write_all(prompt.as_bytes()).await?;
            // dropping stdin closes it, so the generator knows the prompt is complete
            drop(stdin);
            Ok::<_, std::io::Error>(())
        };
        let (_, output) =
            tokio::try_join!(write_prompt, child.wait_with_output()).map_err(failed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationServiceError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| GenerationServiceError::Failed("the answer is not valid UTF-8".into()))
    }
}

#[async_trait]
impl TextGenerator for CommandGenerator {
    async fn generate(
        &self,
        request: &str,
        schema_description: &str,
    ) -> Result<String, GenerationServiceError> {
        log::debug!("running {} {:?}", self.program, self.args);

        let prompt = build_prompt(request, schema_description);
        match tokio::time::timeout(self.timeout, self.run(prompt)).await {
            Ok(answer) => answer,
            Err(_) => Err(GenerationServiceError::TimedOut(self.timeout.as_secs())),
        }
    }
}

fn failed(error: std::io::Error) -> GenerationServiceError {
    GenerationServiceError::Failed(error.to_string())
}

pub fn ask(params: AskParams) -> Result<(), sql_fetcher::Error> {
    let catalog = super::current_catalog()?;

    let command_line = match params.generator {
        Some(generator) => generator,
        None => std::env::var(GENERATOR_VARIABLE)?,
    };
    let timeout = Duration::from_secs(params.timeout);
    let generator = CommandGenerator::parse(&command_line, api_key()?, timeout)
        .ok_or_else(|| InternalError("The generator command is empty".to_string()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;

    let session = Session::new(catalog);
    let assistant = Assistant::new(generator);
    let sql = runtime.block_on(session.ask(&assistant, &params.request.join(" ")))?;

    println!("{sql}");

    Ok(())
}

/// A key that was never saved is fine, not every generator needs one.
fn api_key() -> Result<Option<String>, sql_fetcher::Error> {
    match cache::read::<Credential, _>(&CredentialName::generation_api_key()) {
        Ok(credential) => Ok(Some(credential.secret)),
        Err(error) if matches!(error.kind(), ErrorKind::IoError(_)) => Ok(None),
        Err(error) => Err(error),
    }
}

pub fn save_api_key() -> Result<(), sql_fetcher::Error> {
    let secret = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("API key for the text generator")
        .interact()?;

    cache::write(&Credential {
        name: CredentialName::generation_api_key(),
        secret,
    })?;

    println!(
        "Saved. Generators will find it in the {} environment variable.",
        API_KEY_VARIABLE.bold()
    );

    Ok(())
}
