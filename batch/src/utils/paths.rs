use common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_INPUT_PATTERN: &str =
    "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_{year:04d}-{month:02d}.parquet";

pub const DEFAULT_OUTPUT_PATTERN: &str =
    "s3://nyc-duration-prediction/taxi_type=yellow/year={year:04d}/month={month:02d}/predictions.parquet";

// Either an escaped brace or a `{name}` / `{name:spec}` placeholder.
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{(?P<name>[^{}:]*)(?::(?P<spec>[^{}]*))?\}")
        .expect("Invalid template token regex")
});

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Year,
    Month,
}

/// A parsed `{year}`/`{month}` location template.
#[derive(Debug, Clone, PartialEq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in TOKEN_REGEX.captures_iter(template) {
            let token = caps.get(0).expect("capture group 0 always matches");
            push_literal(&mut literal, &template[last..token.start()], template)?;
            last = token.end();

            match token.as_str() {
                "{{" => literal.push('{'),
                "}}" => literal.push('}'),
                _ => {
                    let name = caps.name("name").map(|m| m.as_str()).unwrap_or_default();
                    let spec = caps.name("spec").map(|m| m.as_str());
                    let segment = match (name, spec) {
                        ("year", None | Some("04d")) => Segment::Year,
                        ("month", None | Some("02d")) => Segment::Month,
                        _ => {
                            return Err(Error::Config(format!(
                                "Unsupported placeholder '{}' in path template '{}'",
                                token.as_str(),
                                template
                            )));
                        }
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
            }
        }
        push_literal(&mut literal, &template[last..], template)?;
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn render(&self, year: i32, month: u32) -> String {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Year => rendered.push_str(&format!("{:04}", year)),
                Segment::Month => rendered.push_str(&format!("{:02}", month)),
            }
        }
        rendered
    }
}

fn push_literal(buffer: &mut String, text: &str, template: &str) -> Result<()> {
    if text.contains('{') || text.contains('}') {
        return Err(Error::Config(format!(
            "Unbalanced brace in path template '{}'",
            template
        )));
    }
    buffer.push_str(text);
    Ok(())
}

/// Resolves the input and output locations of a partition.
#[derive(Debug, Clone)]
pub struct PathResolver {
    input: PathTemplate,
    output: PathTemplate,
}

impl PathResolver {
    /// Builds a resolver from optional overrides, falling back to the
    /// default patterns. Malformed templates fail here, never at resolve time.
    pub fn new(input_override: Option<&str>, output_override: Option<&str>) -> Result<Self> {
        Self::with_defaults(
            DEFAULT_INPUT_PATTERN,
            DEFAULT_OUTPUT_PATTERN,
            input_override,
            output_override,
        )
    }

    pub fn with_defaults(
        default_input: &str,
        default_output: &str,
        input_override: Option<&str>,
        output_override: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            input: PathTemplate::parse(input_override.unwrap_or(default_input))?,
            output: PathTemplate::parse(output_override.unwrap_or(default_output))?,
        })
    }

    pub fn resolve_input(&self, year: i32, month: u32) -> String {
        self.input.render(year, month)
    }

    pub fn resolve_output(&self, year: i32, month: u32) -> String {
        self.output.render(year, month)
    }
}

/// Checks that a (year, month) key names a real calendar month.
pub fn validate_partition(year: i32, month: u32) -> Result<()> {
    if !(0..=9999).contains(&year) {
        return Err(Error::Config(format!("Year {} is out of range", year)));
    }
    if !(1..=12).contains(&month) {
        return Err(Error::Config(format!("Month {} is out of range", month)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns() {
        let resolver = PathResolver::new(None, None).unwrap();
        assert_eq!(
            resolver.resolve_input(2022, 2),
            "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2022-02.parquet"
        );
        assert_eq!(
            resolver.resolve_output(2022, 2),
            "s3://nyc-duration-prediction/taxi_type=yellow/year=2022/month=02/predictions.parquet"
        );
    }

    #[test]
    fn test_override_replaces_default() {
        let resolver = PathResolver::new(
            Some("s3://nyc-duration/in/{year:04d}-{month:02d}.parquet"),
            Some("out/{year}/{month}.parquet"),
        )
        .unwrap();
        assert_eq!(
            resolver.resolve_input(2023, 11),
            "s3://nyc-duration/in/2023-11.parquet"
        );
        assert_eq!(resolver.resolve_output(2023, 3), "out/2023/03.parquet");
    }

    #[test]
    fn test_plain_placeholders_are_padded() {
        let template = PathTemplate::parse("{year}_{month}").unwrap();
        assert_eq!(template.render(987, 1), "0987_01");
    }

    #[test]
    fn test_escaped_braces() {
        let template = PathTemplate::parse("{{raw}}/{year}").unwrap();
        assert_eq!(template.render(2021, 5), "{raw}/2021");
    }

    #[test]
    fn test_malformed_templates_fail_at_construction() {
        for bad in [
            "data/{day}.parquet",
            "data/{year:2d}.parquet",
            "data/{year.parquet",
            "data/year}.parquet",
            "data/{}.parquet",
        ] {
            let err = PathResolver::new(Some(bad), None).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{} -> {:?}", bad, err);
        }
    }

    #[test]
    fn test_validate_partition() {
        assert!(validate_partition(2022, 1).is_ok());
        assert!(validate_partition(2022, 12).is_ok());
        assert!(matches!(validate_partition(2022, 0), Err(Error::Config(_))));
        assert!(matches!(validate_partition(2022, 13), Err(Error::Config(_))));
        assert!(matches!(validate_partition(-1, 5), Err(Error::Config(_))));
    }
}
