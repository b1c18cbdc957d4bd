use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

/// Status-code expectation found in a test script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCheck {
    Exact(u16),
    /// Any status in the given hundred, e.g. `Class(2)` for 2xx.
    Class(u16),
}

/// What the native engine makes of one piece of a test script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCheck {
    Status(StatusCheck),
    /// An assertion the native engine cannot evaluate, named after its test.
    Unsupported(String),
}

static PM_TEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"pm\.test\(\s*["'`]([^"'`]*)["'`]"#).expect("valid regex"));

static LEGACY_TEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"tests\[\s*["']([^"'\]]*)["']\s*\]\s*=\s*([^;\n]+)"#).expect("valid regex")
});

static HAVE_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"pm\.response\.to\.have\.status\(\s*(\d{3})\s*\)").expect("valid regex")
});

static EXPECT_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"pm\.expect\(\s*(?:pm\.response\.code|responseCode\.code)\s*\)\s*\.to\.(?:eql|equal|eq|be\.equal)\(\s*(\d{3})\s*\)",
    )
    .expect("valid regex")
});

static LEGACY_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:pm\.response\.code|responseCode\.code)\s*===?\s*(\d{3})").expect("valid regex")
});

static SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"pm\.response\.to\.be\.(ok|success|created|accepted|noContent|badRequest|unauthorized|forbidden|notFound|clientError|serverError)\b",
    )
    .expect("valid regex")
});

/// Anything assertion-like left over once status checks are blanked out.
static ASSERTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bexpect\(|\.to\.|\.should\b|\bassert\w*\(").expect("valid regex"));

impl StatusCheck {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusCheck::Exact(expected) => status == *expected,
            StatusCheck::Class(class) => status / 100 == *class,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            StatusCheck::Exact(expected) => format!("Status code is {expected}"),
            StatusCheck::Class(class) => format!("Status code is {class}xx"),
        }
    }

    pub fn failure_message(&self, actual: u16) -> String {
        match self {
            StatusCheck::Exact(expected) => {
                format!("expected response to have status code {expected} but got {actual}")
            }
            StatusCheck::Class(class) => {
                format!("expected response to have a {class}xx status code but got {actual}")
            }
        }
    }

    fn from_shorthand(name: &str) -> Option<Self> {
        Some(match name {
            "ok" => StatusCheck::Exact(200),
            "created" => StatusCheck::Exact(201),
            "accepted" => StatusCheck::Exact(202),
            "noContent" => StatusCheck::Exact(204),
            "badRequest" => StatusCheck::Exact(400),
            "unauthorized" => StatusCheck::Exact(401),
            "forbidden" => StatusCheck::Exact(403),
            "notFound" => StatusCheck::Exact(404),
            "success" => StatusCheck::Class(2),
            "clientError" => StatusCheck::Class(4),
            "serverError" => StatusCheck::Class(5),
            _ => return None,
        })
    }
}

/// Checks in `script`, in the order they appear. Every `pm.test` block (and
/// every legacy `tests[...]` entry) that holds something other than a status
/// check yields one [`ScriptCheck::Unsupported`].
pub fn script_checks(script: &str) -> Vec<ScriptCheck> {
    let starts: Vec<(usize, String)> = PM_TEST
        .captures_iter(script)
        .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str().to_string())))
        .collect();

    let mut checks = Vec::new();
    let first = starts.first().map(|(start, _)| *start).unwrap_or(script.len());
    segment_checks(&script[..first], "test script", &mut checks);

    for (index, (start, name)) in starts.iter().enumerate() {
        let end = starts
            .get(index + 1)
            .map(|(next, _)| *next)
            .unwrap_or(script.len());
        segment_checks(&script[*start..end], name, &mut checks);
    }

    checks
}

/// Status-code checks in `script`, ignoring anything else.
pub fn status_checks(script: &str) -> Vec<StatusCheck> {
    script_checks(script)
        .into_iter()
        .filter_map(|check| match check {
            ScriptCheck::Status(status) => Some(status),
            ScriptCheck::Unsupported(_) => None,
        })
        .collect()
}

fn segment_checks(segment: &str, name: &str, out: &mut Vec<ScriptCheck>) {
    let mut rest = segment.to_string();
    let mut found: Vec<(usize, ScriptCheck)> = Vec::new();

    for caps in LEGACY_TEST.captures_iter(segment) {
        let (Some(whole), Some(label), Some(rhs)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let statuses = status_matches(rhs.as_str());
        if statuses.is_empty() {
            found.push((
                whole.start(),
                ScriptCheck::Unsupported(label.as_str().to_string()),
            ));
        }
        found.extend(
            statuses
                .into_iter()
                .map(|(_, check)| (whole.start(), ScriptCheck::Status(check))),
        );
        blank(&mut rest, whole.range());
    }

    for (range, check) in status_matches(&rest) {
        found.push((range.start, ScriptCheck::Status(check)));
        blank(&mut rest, range);
    }

    if ASSERTION_MARKER.is_match(&rest) {
        found.push((segment.len(), ScriptCheck::Unsupported(name.to_string())));
    }

    found.sort_by_key(|(position, _)| *position);
    out.extend(found.into_iter().map(|(_, check)| check));
}

fn status_matches(text: &str) -> Vec<(Range<usize>, StatusCheck)> {
    let mut found = Vec::new();

    for pattern in [&*HAVE_STATUS, &*EXPECT_CODE, &*LEGACY_CODE] {
        for caps in pattern.captures_iter(text) {
            let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if let Ok(code) = code.as_str().parse() {
                found.push((whole.range(), StatusCheck::Exact(code)));
            }
        }
    }

    for caps in SHORTHAND.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if let Some(check) = StatusCheck::from_shorthand(name.as_str()) {
            found.push((whole.range(), check));
        }
    }

    // a legacy comparison inside an expect(...) call is already covered
    found.sort_by_key(|(range, _)| range.start);
    let mut covered_until = 0;
    found.retain(|(range, _)| {
        if range.start < covered_until {
            return false;
        }
        covered_until = range.end;
        true
    });
    found
}

fn blank(text: &mut String, range: Range<usize>) {
    let spaces = " ".repeat(range.len());
    text.replace_range(range, &spaces);
}
