use once_cell::sync::Lazy;
use regex::Regex;

//
// occurrence ( \Parent\Parent... [(min*max\)] ( \Name | (1*(\Name)) ) )
//
static PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]*\*[0-9]*)\(((?:\\[a-zA-Z0-9.\-]+)*)(?:\(([0-9]*\*[0-9]*)\\\))?(?:(\\[a-zA-Z0-9.\-]+)|(?:\(1\*\((\\[a-zA-Z0-9.\-]+)\)\)))\)$")
        .expect("path grammar pattern should compile")
});

///
/// Minimum and maximum repetition bounds of a path part.
///
/// A `max` of `None` means the part may repeat without bound.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Occurrence {
    pub min: u64,
    pub max: Option<u64>,
}

impl Occurrence {
    pub const ANY: Occurrence = Occurrence { min: 0, max: None };

    fn parse(source: &str) -> Option<Self> {
        let (min, max) = source.split_once('*')?;
        let min = if min.is_empty() { 0 } else { min.parse().ok()? };
        let max = if max.is_empty() { None } else { Some(max.parse().ok()?) };
        Some(Occurrence { min, max })
    }
}

impl Default for Occurrence {
    fn default() -> Self {
        Occurrence::ANY
    }
}

///
/// One ancestor (or final) part of an element path.
///
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum PathSegment {
    Name(String),

    ///
    /// A run of arbitrary ancestors whose length is bounded by the occurrence.
    ///
    Variable(Occurrence),
}

///
/// Structural placement of an element, compiled once from its path string.
///
/// `level` is the nesting depth of the element (0 for a child of the document root) and is the only field the decoder compares at runtime.  Elements with a `variable` ancestor run (global elements such as `Void` or `CRC-32`) never implicitly close unknown-sized parents.
///
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PathContext {
    pub level: i64,
    pub variable: bool,
    pub recursive: bool,
    pub occurrence: Occurrence,
    pub segments: Vec<PathSegment>,
}

impl PathContext {

    ///
    /// Parses an EBML path string such as `1*1(\EBML\DocType)` or `*((1*\)\Void)`.
    ///
    /// Returns `None` if the string doesn't match the path grammar.  Callers should fall back to a raw nesting level in that case.
    ///
    pub fn parse(source: &str) -> Option<Self> {
        let captures = PATH_PATTERN.captures(source)?;

        let occurrence = Occurrence::parse(captures.get(1)?.as_str())?;
        let variable = match captures.get(3) {
            Some(part) => Some(Occurrence::parse(part.as_str())?),
            None => None,
        };

        // The leading separator yields an empty root part which is not an ancestor
        let mut segments: Vec<PathSegment> = captures.get(2)
            .map(|parents| parents.as_str())
            .unwrap_or_default()
            .split('\\')
            .skip(1)
            .map(|name| PathSegment::Name(name.to_string()))
            .collect();

        if let Some(bounds) = variable {
            segments.push(PathSegment::Variable(bounds));
        }

        let recursive = captures.get(5).is_some();
        let last = captures.get(4).or_else(|| captures.get(5))?;
        segments.push(PathSegment::Name(last.as_str()[1..].to_string()));

        let depth: i64 = segments.iter()
            .map(|segment| match segment {
                PathSegment::Name(_) => 1,
                PathSegment::Variable(bounds) => bounds.min as i64,
            })
            .sum();

        Some(PathContext {
            level: depth - 1,
            variable: variable.is_some(),
            recursive,
            occurrence,
            segments,
        })
    }

    ///
    /// Context for a schema entry that only declares a raw nesting level.
    ///
    pub fn from_level(level: i64) -> Self {
        PathContext {
            level,
            variable: false,
            recursive: false,
            occurrence: Occurrence::ANY,
            segments: Vec::new(),
        }
    }

    ///
    /// Context of a global element that may appear under at least `min_depth` arbitrary ancestors.
    ///
    pub fn global(name: &str, min_depth: u64) -> Self {
        PathContext {
            level: min_depth as i64,
            variable: true,
            recursive: false,
            occurrence: Occurrence::ANY,
            segments: vec![
                PathSegment::Variable(Occurrence { min: min_depth, max: None }),
                PathSegment::Name(name.to_string()),
            ],
        }
    }

    ///
    /// Names of the fixed ancestors leading to (and including) this element.
    ///
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            PathSegment::Name(name) => Some(name.as_str()),
            PathSegment::Variable(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> PathSegment {
        PathSegment::Name(value.to_string())
    }

    #[test]
    fn root_element() {
        let context = PathContext::parse(r"*(\StringElement)").expect("should parse");

        assert_eq!(0, context.level);
        assert!(!context.variable);
        assert!(!context.recursive);
        assert_eq!(Occurrence::ANY, context.occurrence);
        assert_eq!(vec![name("StringElement")], context.segments);
    }

    #[test]
    fn nested_element() {
        let context = PathContext::parse(r"1*1(\EBML\DocType)").expect("should parse");

        assert_eq!(1, context.level);
        assert_eq!(Occurrence { min: 1, max: Some(1) }, context.occurrence);
        assert_eq!(vec![name("EBML"), name("DocType")], context.segments);
        assert_eq!(vec!["EBML", "DocType"], context.names().collect::<Vec<_>>());
    }

    #[test]
    fn global_element() {
        let context = PathContext::parse(r"*((1*\)\Unknown)").expect("should parse");

        assert_eq!(1, context.level);
        assert!(context.variable);
        assert_eq!(PathContext::global("Unknown", 1), context);
    }

    #[test]
    fn global_element_without_minimum() {
        let context = PathContext::parse(r"0*((*\)\Void)").expect("should parse");

        assert_eq!(0, context.level);
        assert!(context.variable);
        assert_eq!(vec![PathSegment::Variable(Occurrence::ANY), name("Void")], context.segments);
    }

    #[test]
    fn recursive_element() {
        let context = PathContext::parse(r"0*(\Segment\Chapters\EditionEntry(1*(\ChapterAtom)))").expect("should parse");

        assert_eq!(3, context.level);
        assert!(context.recursive);
        assert!(!context.variable);
        assert_eq!(Some("ChapterAtom"), context.names().last());
    }

    #[test]
    fn names_with_punctuation() {
        let context = PathContext::parse(r"0*1((1*\)\CRC-32)").expect("should parse");

        assert_eq!(Occurrence { min: 0, max: Some(1) }, context.occurrence);
        assert_eq!(Some("CRC-32"), context.names().last());
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(None, PathContext::parse(""));
        assert_eq!(None, PathContext::parse(r"\EBML\DocType"));
        assert_eq!(None, PathContext::parse(r"*(EBML)"));
        assert_eq!(None, PathContext::parse(r"*(\EBML\)"));
        assert_eq!(None, PathContext::parse(r"99999999999999999999*(\EBML)"));
    }
}
