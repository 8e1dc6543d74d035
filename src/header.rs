use regex::Regex;
use std::sync::OnceLock;

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})학년도").expect("static regex"))
}

fn semester_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)학기").expect("static regex"))
}

/// Pulls (year, semester) out of a sheet title such as
/// "2024학년도 1학기 원격연수 이수자 명단".
///
/// Both markers are searched independently anywhere in the text.
pub fn extract_year_semester(title: &str) -> anyhow::Result<(i64, i64)> {
    let Some(year) = year_re()
        .captures(title)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
    else {
        anyhow::bail!("cannot find year (\"YYYY학년도\") in sheet title: {:?}", title);
    };
    let Some(semester) = semester_re()
        .captures(title)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
    else {
        anyhow::bail!("cannot find semester (\"N학기\") in sheet title: {:?}", title);
    };
    Ok((year, semester))
}
