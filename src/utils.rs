#[macro_export]
macro_rules! post_funcs {
    ( $( ( $func_name:ident, $url:expr, $request:ty, $response:ty ) ),+ $(,)? ) => {
        $(
            paste::paste! {
                #[post($url)]
                async fn $func_name(
                    pool: web::Data<DbPool>,
                    req: HttpRequest,
                    info: web::Json<$request>
                ) -> impl Responder {
                    let response = match [<$func_name _impl>](pool, req, info).await {
                        Ok(response) => response,
                        Err(err) => {
                            log::warn!("{} failed: {:#}", stringify!($func_name), err);
                            <$response>::err(err.to_string())
                        }
                    };
                    HttpResponse::Ok().json(response)
                }
            }
        )+
    };
}

use anyhow::{bail, Context};
use blake2::{Blake2b, Digest};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

pub fn hash_password<S: AsRef<str>>(password: S) -> String {
    format!("{:x}", Blake2b::digest(password.as_ref().as_bytes()))
}

pub fn assert_password_str(password: &str) -> anyhow::Result<()> {
    if password.chars().count() < 6 {
        bail!("Password must have at least 6 characters")
    }
    Ok(())
}

pub fn assert_email_str(email: &str) -> anyhow::Result<()> {
    let mut parts = email.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(user), Some(domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => bail!("Wrong email format"),
    }
}

pub fn normalize_email<S: AsRef<str>>(email: S) -> String {
    email.as_ref().trim().to_lowercase()
}

pub fn parse_time_str<S: AsRef<str>>(s: S) -> anyhow::Result<NaiveDateTime> {
    const TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
    const TIME_FMT_SPECIAL: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
    const TIME_FMT_NAIVE: &str = "%Y-%m-%dT%H:%M:%S%.f";

    let s = s.as_ref();
    if let Some('Z') = s.chars().last() {
        NaiveDateTime::parse_from_str(s, TIME_FMT_SPECIAL).context("Wrong time format")
    } else if let Ok(t) = DateTime::parse_from_str(s, TIME_FMT) {
        Ok(t.naive_utc())
    } else {
        NaiveDateTime::parse_from_str(s, TIME_FMT_NAIVE).context("Wrong time format")
    }
}

pub fn parse_time_str_opt<S: AsRef<str>>(s: Option<S>) -> anyhow::Result<Option<NaiveDateTime>> {
    s.map(parse_time_str).transpose()
}

pub fn parse_time_pair_str_opt<S1: AsRef<str>, S2: AsRef<str>>(
    start_time: Option<S1>,
    end_time: Option<S2>,
) -> anyhow::Result<(NaiveDateTime, NaiveDateTime)> {
    let time_min = parse_time_str("1901-01-01T00:00:00.0000Z")?;
    let time_max = parse_time_str("2901-01-01T00:00:00.0000Z")?;
    let start_time = start_time.map_or(Ok(time_min), |t| {
        parse_time_str(t).context("Wrong format on 'start_time'")
    })?;
    let end_time = end_time.map_or(Ok(time_max), |t| {
        parse_time_str(t).context("Wrong format on 'end_time'")
    })?;
    Ok((start_time, end_time))
}

pub fn parse_time_pair_str<S1: AsRef<str>, S2: AsRef<str>>(
    start_time: S1,
    end_time: S2,
) -> anyhow::Result<(NaiveDateTime, NaiveDateTime)> {
    let start_time = parse_time_str(start_time).context("Wrong format on 'start_time'")?;
    let end_time = parse_time_str(end_time).context("Wrong format on 'end_time'")?;
    Ok((start_time, end_time))
}

pub fn parse_date_str<S: AsRef<str>>(s: S) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.as_ref(), "%Y-%m-%d").context("Wrong date format")
}

pub fn format_time_str(time: &NaiveDateTime) -> String {
    const TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    format!("{}+00:00", time.format(TIME_FMT))
}

pub fn format_time_str_opt(time: &Option<NaiveDateTime>) -> String {
    time.as_ref().map_or("".to_string(), format_time_str)
}

pub fn format_date_str(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `%keyword%` with `\`, `%` and `_` escaped, so the keyword matches literally
/// under MySQL's default `LIKE` escape character.
pub fn get_str_pattern<S: AsRef<str>>(s: S) -> String {
    let mut pattern = String::with_capacity(s.as_ref().len() + 2);
    pattern.push('%');
    for c in s.as_ref().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn get_str_pattern_opt<S: AsRef<str>>(s: Option<S>) -> String {
    match s {
        Some(s) => get_str_pattern(s),
        None => "%".to_string(),
    }
}

/// Clamps `first_index` and `limit` from a search request.
pub fn get_page(first_index: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let first_index = first_index.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(DEFAULT_LIMIT).max(0).min(MAX_LIMIT);
    (first_index, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd(2021, 5, 3).and_hms(h, m, 0)
    }

    #[test]
    fn parses_utc_suffix() {
        assert_eq!(parse_time_str("2021-05-03T09:30:00.000Z").unwrap(), at(9, 30));
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        assert_eq!(
            parse_time_str("2021-05-03T17:30:00+08:00").unwrap(),
            at(9, 30)
        );
    }

    #[test]
    fn naive_times_are_taken_as_utc() {
        assert_eq!(parse_time_str("2021-05-03T09:30:00").unwrap(), at(9, 30));
    }

    #[test]
    fn garbage_times_are_rejected() {
        assert!(parse_time_str("tomorrow").is_err());
        assert!(parse_time_str("2021-05-03").is_err());
    }

    #[test]
    fn missing_bounds_open_the_window() {
        let (start, end) = parse_time_pair_str_opt::<String, &str>(None, Some("2021-05-03T10:00:00Z"))
            .unwrap();
        assert!(start < at(0, 0));
        assert_eq!(end, at(10, 0));
    }

    #[test]
    fn formatted_time_parses_back() {
        let t = at(14, 5);
        assert_eq!(format_time_str(&t), "2021-05-03T14:05:00+00:00");
        assert_eq!(parse_time_str(format_time_str(&t)).unwrap(), t);
    }

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(get_page(None, None), (0, DEFAULT_LIMIT));
        assert_eq!(get_page(Some(-3), Some(-1)), (0, 0));
        assert_eq!(get_page(Some(20), Some(10_000)), (20, MAX_LIMIT));
    }

    #[test]
    fn patterns_wrap_keyword() {
        assert_eq!(get_str_pattern_opt(Some("ann")), "%ann%");
        assert_eq!(get_str_pattern_opt::<&str>(None), "%");
    }

    #[test]
    fn like_wildcards_in_keywords_are_literal() {
        assert_eq!(get_str_pattern("50%"), r"%50\%%");
        assert_eq!(get_str_pattern("a_b"), r"%a\_b%");
        assert_eq!(get_str_pattern(r"c:\x"), r"%c:\\x%");
    }

    #[test]
    fn password_hash_is_stable_hex() {
        let hashed = hash_password("secret1");
        assert_eq!(hashed.len(), 128);
        assert_eq!(hashed, hash_password("secret1"));
        assert_ne!(hashed, hash_password("secret2"));
    }

    #[test]
    fn emails_need_user_and_domain() {
        assert!(assert_email_str("desk@clinic.org").is_ok());
        assert!(assert_email_str("@clinic.org").is_err());
        assert!(assert_email_str("desk@localhost").is_err());
        assert!(assert_email_str("desk").is_err());
        assert_eq!(normalize_email("  Desk@Clinic.ORG "), "desk@clinic.org");
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(assert_password_str("12345").is_err());
        assert!(assert_password_str("123456").is_ok());
    }
}
