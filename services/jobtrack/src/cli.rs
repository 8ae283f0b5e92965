//! Argument parsing
//!
//! Parsing is pure: it turns words into a `Command` and never touches the
//! network or the filesystem. The same parser serves the process arguments
//! and each line typed into `jobtrack shell`.

use api_client::ApplicationStatus;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const USAGE: &str = "\
usage: jobtrack [--config PATH] [--api-url URL] <command> [args]

session:
  login <email>
  register <name> <email> [--admin-key KEY]
  logout
  whoami
  refresh
  profile-update <email> [--name NAME]

jobs:
  jobs
  job-add <company> <role> <salary> [experience] [--description TEXT]
  job-edit <id> [--company C] [--role R] [--salary S] [--experience E] [--description TEXT]
  job-delete <id>

applications:
  apply <job-id> <name> <email> <phone> <resume-file> [--replace PUBLIC-ID]
  applications [--all]
  stats
  set-status <application-id> <status>
  mark-viewed <application-id>

ai:
  cover-letter <role> <company> [tone] [--resume FILE] [--extra TEXT]
  feedback <resume-file> <job-description>
  questions <role> [company]

  shell        read commands from stdin, keeping one session
  help

The login password is read from JOBTRACK_PASSWORD or session.password_file.";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: Option<String>,
    pub api_url: Option<String>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        email: String,
    },
    Register {
        name: String,
        email: String,
        admin_key: Option<String>,
    },
    Logout,
    Whoami,
    Refresh,
    ProfileUpdate {
        email: String,
        name: Option<String>,
    },
    Jobs,
    JobAdd {
        company: String,
        role: String,
        salary: String,
        experience: Option<String>,
        description: Option<String>,
    },
    JobEdit {
        id: String,
        company: Option<String>,
        role: Option<String>,
        salary: Option<String>,
        experience: Option<String>,
        description: Option<String>,
    },
    JobDelete {
        id: String,
    },
    Apply {
        job_id: String,
        name: String,
        email: String,
        phone: String,
        resume: PathBuf,
        /// Stored resume to delete before uploading the new one
        replace: Option<String>,
    },
    Applications {
        all: bool,
    },
    Stats,
    SetStatus {
        id: String,
        status: ApplicationStatus,
    },
    MarkViewed {
        id: String,
    },
    CoverLetter {
        role: String,
        company: String,
        tone: Option<String>,
        resume: Option<PathBuf>,
        extra: Option<String>,
    },
    Feedback {
        resume: PathBuf,
        job_description: String,
    },
    Questions {
        role: String,
        company: Option<String>,
    },
    Shell,
    Help,
}

impl Command {
    /// Name used in logs and usage errors.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Register { .. } => "register",
            Command::Logout => "logout",
            Command::Whoami => "whoami",
            Command::Refresh => "refresh",
            Command::ProfileUpdate { .. } => "profile-update",
            Command::Jobs => "jobs",
            Command::JobAdd { .. } => "job-add",
            Command::JobEdit { .. } => "job-edit",
            Command::JobDelete { .. } => "job-delete",
            Command::Apply { .. } => "apply",
            Command::Applications { .. } => "applications",
            Command::Stats => "stats",
            Command::SetStatus { .. } => "set-status",
            Command::MarkViewed { .. } => "mark-viewed",
            Command::CoverLetter { .. } => "cover-letter",
            Command::Feedback { .. } => "feedback",
            Command::Questions { .. } => "questions",
            Command::Shell => "shell",
            Command::Help => "help",
        }
    }
}

/// Parse process arguments (without the program name).
pub fn parse(args: &[String]) -> Result<Invocation> {
    let mut config = None;
    let mut api_url = None;
    let mut rest = args;

    // Global flags come before the command word
    while let Some(first) = rest.first() {
        match first.as_str() {
            "--config" => {
                config = Some(flag_value(rest, "--config")?);
                rest = &rest[2..];
            }
            "--api-url" => {
                api_url = Some(flag_value(rest, "--api-url")?);
                rest = &rest[2..];
            }
            "-h" | "--help" => {
                rest = &[];
                break;
            }
            _ => break,
        }
    }

    let command = if rest.is_empty() {
        Command::Help
    } else {
        parse_command(rest)?
    };

    Ok(Invocation {
        config,
        api_url,
        command,
    })
}

fn flag_value(rest: &[String], flag: &str) -> Result<String> {
    rest.get(1)
        .cloned()
        .ok_or_else(|| Error::MissingFlagValue(flag.to_string()))
}

/// Parse a command word and its arguments.
pub fn parse_command(words: &[String]) -> Result<Command> {
    let Some((head, tail)) = words.split_first() else {
        return Ok(Command::Help);
    };

    let command = match head.as_str() {
        "login" => {
            let args = Args::split("login", tail, &[], &[])?;
            let [email] = args.exact::<1>("login <email>")?;
            Command::Login { email }
        }
        "register" => {
            let mut args = Args::split("register", tail, &["--admin-key"], &[])?;
            let admin_key = args.take_option("--admin-key");
            let [name, email] = args.exact::<2>("register <name> <email> [--admin-key KEY]")?;
            Command::Register {
                name,
                email,
                admin_key,
            }
        }
        "logout" => no_args("logout", tail, Command::Logout)?,
        "whoami" => no_args("whoami", tail, Command::Whoami)?,
        "refresh" => no_args("refresh", tail, Command::Refresh)?,
        "profile-update" => {
            let mut args = Args::split("profile-update", tail, &["--name"], &[])?;
            let name = args.take_option("--name");
            let [email] = args.exact::<1>("profile-update <email> [--name NAME]")?;
            Command::ProfileUpdate { email, name }
        }
        "jobs" => no_args("jobs", tail, Command::Jobs)?,
        "job-add" => {
            let mut args = Args::split("job-add", tail, &["--description"], &[])?;
            let description = args.take_option("--description");
            let usage = "job-add <company> <role> <salary> [experience] [--description TEXT]";
            let (required, experience) = args.with_optional::<3>(usage)?;
            let [company, role, salary] = required;
            Command::JobAdd {
                company,
                role,
                salary,
                experience,
                description,
            }
        }
        "job-edit" => {
            let mut args = Args::split(
                "job-edit",
                tail,
                &[
                    "--company",
                    "--role",
                    "--salary",
                    "--experience",
                    "--description",
                ],
                &[],
            )?;
            let company = args.take_option("--company");
            let role = args.take_option("--role");
            let salary = args.take_option("--salary");
            let experience = args.take_option("--experience");
            let description = args.take_option("--description");
            let [id] = args.exact::<1>("job-edit <id> [--company C] [--role R] [--salary S] [--experience E] [--description TEXT]")?;
            Command::JobEdit {
                id,
                company,
                role,
                salary,
                experience,
                description,
            }
        }
        "job-delete" => {
            let args = Args::split("job-delete", tail, &[], &[])?;
            let [id] = args.exact::<1>("job-delete <id>")?;
            Command::JobDelete { id }
        }
        "apply" => {
            let mut args = Args::split("apply", tail, &["--replace"], &[])?;
            let replace = args.take_option("--replace");
            let [job_id, name, email, phone, resume] = args.exact::<5>(
                "apply <job-id> <name> <email> <phone> <resume-file> [--replace PUBLIC-ID]",
            )?;
            Command::Apply {
                job_id,
                name,
                email,
                phone,
                resume: PathBuf::from(resume),
                replace,
            }
        }
        "applications" => {
            let args = Args::split("applications", tail, &[], &["--all"])?;
            let all = args.has_switch("--all");
            args.exact::<0>("applications [--all]")?;
            Command::Applications { all }
        }
        "stats" => no_args("stats", tail, Command::Stats)?,
        "set-status" => {
            let args = Args::split("set-status", tail, &[], &[])?;
            let usage = "set-status <application-id> <status>";
            // Statuses may be typed unquoted: `set-status 42 Interview Scheduled`
            let mut positional = args.positional.into_iter();
            let (Some(id), status) = (positional.next(), positional.collect::<Vec<_>>().join(" "))
            else {
                return Err(Error::Usage(usage));
            };
            if status.is_empty() {
                return Err(Error::Usage(usage));
            }
            let status = status
                .parse::<ApplicationStatus>()
                .map_err(|_| Error::InvalidStatus(status.clone()))?;
            Command::SetStatus { id, status }
        }
        "mark-viewed" => {
            let args = Args::split("mark-viewed", tail, &[], &[])?;
            let [id] = args.exact::<1>("mark-viewed <application-id>")?;
            Command::MarkViewed { id }
        }
        "cover-letter" => {
            let mut args = Args::split("cover-letter", tail, &["--resume", "--extra"], &[])?;
            let resume = args.take_option("--resume").map(PathBuf::from);
            let extra = args.take_option("--extra");
            let usage = "cover-letter <role> <company> [tone] [--resume FILE] [--extra TEXT]";
            let ([role, company], tone) = args.with_optional::<2>(usage)?;
            Command::CoverLetter {
                role,
                company,
                tone,
                resume,
                extra,
            }
        }
        "feedback" => {
            let args = Args::split("feedback", tail, &[], &[])?;
            let [resume, job_description] =
                args.exact::<2>("feedback <resume-file> <job-description>")?;
            Command::Feedback {
                resume: PathBuf::from(resume),
                job_description,
            }
        }
        "questions" => {
            let args = Args::split("questions", tail, &[], &[])?;
            let ([role], company) = args.with_optional::<1>("questions <role> [company]")?;
            Command::Questions { role, company }
        }
        "shell" => no_args("shell", tail, Command::Shell)?,
        "help" | "-h" | "--help" => Command::Help,
        other => return Err(Error::UnknownCommand(other.to_string())),
    };

    Ok(command)
}

fn no_args(name: &'static str, tail: &[String], command: Command) -> Result<Command> {
    let args = Args::split(name, tail, &[], &[])?;
    args.exact::<0>(name)?;
    Ok(command)
}

/// Arguments after the command word, split into positionals, `--flag value`
/// options and bare switches.
#[derive(Debug, Default)]
struct Args {
    positional: Vec<String>,
    options: Vec<(&'static str, String)>,
    switches: Vec<&'static str>,
}

impl Args {
    fn split(
        command: &'static str,
        words: &[String],
        options: &[&'static str],
        switches: &[&'static str],
    ) -> Result<Self> {
        let mut args = Args::default();
        let mut words = words.iter();

        while let Some(word) = words.next() {
            if !word.starts_with("--") {
                args.positional.push(word.clone());
                continue;
            }
            if let Some(option) = options.iter().find(|o| **o == word.as_str()) {
                let value = words
                    .next()
                    .ok_or_else(|| Error::MissingFlagValue(word.clone()))?;
                args.options.push((*option, value.clone()));
            } else if let Some(switch) = switches.iter().find(|s| **s == word.as_str()) {
                args.switches.push(*switch);
            } else {
                return Err(Error::UnknownFlag {
                    command,
                    flag: word.clone(),
                });
            }
        }

        Ok(args)
    }

    /// Last occurrence wins.
    fn take_option(&mut self, name: &str) -> Option<String> {
        let mut found = None;
        self.options.retain(|(option, value)| {
            if *option == name {
                found = Some(value.clone());
                false
            } else {
                true
            }
        });
        found
    }

    fn has_switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| *s == name)
    }

    fn exact<const N: usize>(self, usage: &'static str) -> Result<[String; N]> {
        <[String; N]>::try_from(self.positional).map_err(|_| Error::Usage(usage))
    }

    /// `N` required positionals followed by at most one optional one.
    fn with_optional<const N: usize>(
        mut self,
        usage: &'static str,
    ) -> Result<([String; N], Option<String>)> {
        let optional = match self.positional.len() {
            n if n == N => None,
            n if n == N + 1 => self.positional.pop(),
            _ => return Err(Error::Usage(usage)),
        };
        let required = <[String; N]>::try_from(self.positional).map_err(|_| Error::Usage(usage))?;
        Ok((required, optional))
    }
}

/// Split one shell line into words. Double or single quotes group words;
/// there are no escapes.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(Error::UnterminatedQuote(line.to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
