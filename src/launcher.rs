use crate::{
    error::ElevateError,
    resolver::{PathResolver, normalize_network_path},
};
use std::{fmt, iter};

/// Token whose successor names a file that may need a network-path rewrite.
const JAR_FLAG: &str = "-jar";

/// Executable plus the arguments it will receive, in caller order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub executable: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Splits raw tokens into executable and arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ElevateError::MissingExecutable`] when `tokens` is empty.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self, ElevateError> {
        let mut tokens = tokens.into_iter();
        let executable = tokens.next().ok_or(ElevateError::MissingExecutable)?;
        Ok(Self {
            executable,
            args: tokens.collect(),
        })
    }
}

/// Whether the value after `-jar` gets its mapped drive replaced by a UNC share.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    #[default]
    NetworkPaths,
    Verbatim,
}

/// Shell verb handed to `ShellExecuteW`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    #[default]
    RunAs,
    Open,
}

impl Verb {
    /// `Open` only when `if_needed` is set and the token already is elevated.
    /// A failed elevation query falls back to `RunAs`.
    #[must_use]
    pub fn select(if_needed: bool, elevated: impl FnOnce() -> anyhow::Result<bool>) -> Self {
        if !if_needed {
            return Self::RunAs;
        }

        match elevated() {
            Ok(true) => Self::Open,
            Ok(false) => Self::RunAs,
            Err(err) => {
                tracing::warn!("Cannot query token elevation, assuming unelevated (error={err:#})");
                Self::RunAs
            }
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RunAs => "runas",
            Self::Open => "open",
        }
    }
}

/// Applies the `-jar` rewrite, keeping argument count and order intact.
///
/// # Errors
///
/// Fails when a `-jar` value cannot be resolved.
pub fn normalize_arguments(
    args: &[String],
    normalization: Normalization,
    resolver: &dyn PathResolver,
) -> anyhow::Result<Vec<String>> {
    if normalization == Normalization::Verbatim {
        return Ok(args.to_vec());
    }

    let previous = iter::once(None).chain(args.iter().map(Some));
    args.iter()
        .zip(previous)
        .map(|(arg, previous)| -> anyhow::Result<String> {
            if previous.is_some_and(|previous| previous == JAR_FLAG) {
                let normalized = normalize_network_path(resolver, arg)?;
                if normalized != *arg {
                    tracing::info!(from = %arg, to = %normalized, "rewrote -jar path");
                }
                Ok(normalized)
            } else {
                Ok(arg.clone())
            }
        })
        .collect()
}

/// Wraps `arg` in one pair of double quotes.
///
/// Embedded quotes and the backslashes preceding a quote are escaped so that
/// `CommandLineToArgvW` hands the launched program back the original token.
#[must_use]
pub fn quote_argument(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');

    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => {
                backslashes += 1;
                continue;
            }
            '"' => {
                quoted.extend(iter::repeat_n('\\', backslashes * 2 + 1));
            }
            _ => {
                quoted.extend(iter::repeat_n('\\', backslashes));
            }
        }
        quoted.push(c);
        backslashes = 0;
    }

    quoted.extend(iter::repeat_n('\\', backslashes * 2));
    quoted.push('"');
    quoted
}

#[must_use]
pub fn compose_command_line(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote_argument(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything the shell needs to start the target process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub executable: String,
    pub parameters: String,
    pub verb: Verb,
}

impl LaunchRequest {
    /// Normalizes and quotes the invocation's arguments for `verb`.
    ///
    /// # Errors
    ///
    /// Fails when argument normalization fails.
    pub fn build(
        invocation: &Invocation,
        normalization: Normalization,
        verb: Verb,
        resolver: &dyn PathResolver,
    ) -> anyhow::Result<Self> {
        let args = normalize_arguments(&invocation.args, normalization, resolver)?;
        Ok(Self {
            executable: invocation.executable.clone(),
            parameters: compose_command_line(&args),
            verb,
        })
    }
}

impl fmt::Display for LaunchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_argument(&self.executable))?;
        if !self.parameters.is_empty() {
            write!(f, " {}", self.parameters)?;
        }
        Ok(())
    }
}

/// Starts a process through a shell verb without waiting for it.
pub trait ProcessElevator {
    /// # Errors
    ///
    /// Fails when the shell refuses the request, including a declined consent prompt.
    fn launch(&self, request: &LaunchRequest) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::FakeResolver;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingElevator {
        launched: RefCell<Vec<LaunchRequest>>,
    }

    impl ProcessElevator for RecordingElevator {
        fn launch(&self, request: &LaunchRequest) -> anyhow::Result<()> {
            self.launched.borrow_mut().push(request.clone());
            Ok(())
        }
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    fn mapped_resolver() -> FakeResolver {
        FakeResolver::default()
            .with_file(r"D:\data\app.jar", r"D:\data\app.jar")
            .with_file(r"C:\local\app.jar", r"C:\local\app.jar")
            .with_share("D:", r"\\fileserver\shared")
    }

    #[test]
    fn jar_on_mapped_drive_is_rewritten_and_launched_with_runas() {
        let invocation = Invocation::from_tokens(tokens(&[
            "app.exe",
            "-jar",
            r"D:\data\app.jar",
            "--flag",
            "value",
        ]))
        .unwrap();
        let elevator = RecordingElevator::default();

        let request = LaunchRequest::build(
            &invocation,
            Normalization::NetworkPaths,
            Verb::RunAs,
            &mapped_resolver(),
        )
        .unwrap();
        elevator.launch(&request).unwrap();

        let launched = elevator.launched.borrow();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].executable, "app.exe");
        assert_eq!(launched[0].verb.as_str(), "runas");
        assert_eq!(
            launched[0].parameters,
            r#""-jar" "\\fileserver\shared\data\app.jar" "--flag" "value""#
        );
    }

    #[test]
    fn verb_is_runas_unless_asked_to_skip_the_prompt() {
        let verb = Verb::select(false, || panic!("elevation must not be queried"));
        assert_eq!(verb, Verb::RunAs);
    }

    #[test]
    fn verb_is_open_when_already_elevated() {
        assert_eq!(Verb::select(true, || Ok(true)), Verb::Open);
        assert_eq!(Verb::select(true, || Ok(false)), Verb::RunAs);
    }

    #[test]
    fn failed_elevation_query_falls_back_to_runas() {
        let verb = Verb::select(true, || Err(anyhow::anyhow!("access denied")));
        assert_eq!(verb, Verb::RunAs);
    }

    #[test]
    fn plain_arguments_pass_through() {
        let invocation = Invocation::from_tokens(tokens(&["app.exe", "arg1", "arg2"])).unwrap();

        let request = LaunchRequest::build(
            &invocation,
            Normalization::NetworkPaths,
            Verb::RunAs,
            &FakeResolver::default(),
        )
        .unwrap();
        assert_eq!(request.parameters, r#""arg1" "arg2""#);
    }

    #[test]
    fn jar_on_local_drive_is_unchanged() {
        let args = tokens(&["-jar", r"C:\local\app.jar"]);

        let normalized =
            normalize_arguments(&args, Normalization::NetworkPaths, &mapped_resolver()).unwrap();
        assert_eq!(normalized, args);
    }

    #[test]
    fn verbatim_mode_skips_resolution() {
        // not known to the resolver, so normalizing would fail
        let args = tokens(&["-jar", r"D:\missing.jar"]);

        let normalized =
            normalize_arguments(&args, Normalization::Verbatim, &FakeResolver::default()).unwrap();
        assert_eq!(normalized, args);
    }

    #[test]
    fn only_the_token_after_jar_is_resolved() {
        let args = tokens(&[r"D:\data\app.jar", "-jar", r"D:\data\app.jar", r"D:\data\app.jar"]);

        let normalized =
            normalize_arguments(&args, Normalization::NetworkPaths, &mapped_resolver()).unwrap();
        assert_eq!(
            normalized,
            tokens(&[
                r"D:\data\app.jar",
                "-jar",
                r"\\fileserver\shared\data\app.jar",
                r"D:\data\app.jar",
            ])
        );
    }

    #[test]
    fn trailing_jar_flag_has_nothing_to_rewrite() {
        let args = tokens(&["--flag", "-jar"]);

        let normalized =
            normalize_arguments(&args, Normalization::NetworkPaths, &mapped_resolver()).unwrap();
        assert_eq!(normalized, args);
    }

    #[test]
    fn unresolvable_jar_aborts_before_launch() {
        let invocation =
            Invocation::from_tokens(tokens(&["app.exe", "-jar", r"D:\missing.jar"])).unwrap();

        let err = LaunchRequest::build(
            &invocation,
            Normalization::NetworkPaths,
            Verb::RunAs,
            &mapped_resolver(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ElevateError>(),
            Some(ElevateError::PathResolution { .. })
        ));
    }

    #[test]
    fn empty_invocation_is_missing_executable() {
        assert!(matches!(
            Invocation::from_tokens(Vec::new()),
            Err(ElevateError::MissingExecutable)
        ));
    }

    #[test]
    fn executable_without_arguments() {
        let invocation = Invocation::from_tokens(tokens(&["app.exe"])).unwrap();
        assert!(invocation.args.is_empty());

        let request = LaunchRequest::build(
            &invocation,
            Normalization::NetworkPaths,
            Verb::Open,
            &FakeResolver::default(),
        )
        .unwrap();
        assert_eq!(request.parameters, "");
        assert_eq!(request.to_string(), r#""app.exe""#);
    }

    #[test]
    fn display_includes_quoted_executable() {
        let request = LaunchRequest {
            executable: r"C:\Program Files\Java\bin\javaw.exe".to_owned(),
            parameters: compose_command_line(&tokens(&["-jar", "setup.jar"])),
            verb: Verb::RunAs,
        };
        assert_eq!(
            request.to_string(),
            r#""C:\Program Files\Java\bin\javaw.exe" "-jar" "setup.jar""#
        );
    }

    #[test]
    fn composed_line_keeps_order_and_single_spaces() {
        let line = compose_command_line(&tokens(&["a", "", "b c", "d"]));
        assert_eq!(line, r#""a" "" "b c" "d""#);
        assert_eq!(compose_command_line(&[]), "");
    }

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_argument(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote_argument(r#"a\"b"#), r#""a\\\"b""#);
    }

    #[test]
    fn quoting_doubles_only_trailing_backslashes() {
        assert_eq!(quote_argument(r"C:\dir\"), r#""C:\dir\\""#);
        assert_eq!(
            quote_argument(r"\\server\share\app.jar"),
            r#""\\server\share\app.jar""#
        );
        assert_eq!(quote_argument(r"a\\b"), r#""a\\b""#);
    }
}
