//! Filter expression language
//!
//! A filter specification is a single string parsed left to right:
//! `NAME(p1,p2,...)` instantiates a primitive, `F1>>F2` chains filters, and
//! arguments are numbers or nested filter expressions. Whitespace is
//! insignificant and built-in names are case-insensitive. Unknown names are
//! reported with the character offset of the offending name.
//!
//! Constructors live in a string-keyed registry populated with the built-in
//! catalogue at first use; applications may add their own.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::{
    max_filter, min_filter, Average, BandPassEnvelope, Butterworth, ChainFilter, CutOff,
    DemuxFilter, Filter, FilterError, FilterResult, GroundMotion, InitialTaper, ParamCode,
    RandomNormal, RandomUniform, Restitution, RunningMeanHighpass, SelfFilter, SimulationFilter,
    StaLta, StaLta2,
};

/// A parsed constructor argument.
#[derive(Debug)]
pub enum FilterArg {
    Number(f64),
    Filter(Box<dyn Filter>),
}

/// Constructor invoked by the parser. `offset` is the character position of
/// the primitive name, used for error reporting.
pub type FilterConstructor = fn(args: Vec<FilterArg>, offset: usize) -> FilterResult<Box<dyn Filter>>;

static REGISTRY: OnceLock<RwLock<HashMap<String, FilterConstructor>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, FilterConstructor>> {
    REGISTRY.get_or_init(|| RwLock::new(default_table()))
}

/// Register a constructor under `name` (case-insensitive). Replaces any
/// previous registration of the same name.
pub fn register_filter(name: &str, ctor: FilterConstructor) {
    registry().write().insert(name.to_uppercase(), ctor);
}

/// Parse a filter expression into a ready-to-configure filter.
pub fn parse_filter(text: &str) -> FilterResult<Box<dyn Filter>> {
    let mut cursor = Cursor::new(text);
    let filter = cursor.parse_chain()?;
    cursor.skip_whitespace();
    if let Some(c) = cursor.peek() {
        return Err(FilterError::Parse {
            offset: cursor.pos,
            message: format!("unexpected character '{c}'"),
        });
    }
    Ok(filter)
}

// ---------------------------------------------------------------------------
// Built-in constructors

fn expect_numbers(args: Vec<FilterArg>, offset: usize) -> FilterResult<Vec<f64>> {
    args.into_iter()
        .map(|arg| match arg {
            FilterArg::Number(v) => Ok(v),
            FilterArg::Filter(_) => Err(FilterError::Parse {
                offset,
                message: "this filter takes numeric arguments only".into(),
            }),
        })
        .collect()
}

fn configure(
    mut filter: Box<dyn Filter>,
    args: Vec<FilterArg>,
    offset: usize,
) -> FilterResult<Box<dyn Filter>> {
    let params = expect_numbers(args, offset)?;
    if params.is_empty() {
        return Ok(filter);
    }
    match filter.set_parameters(&params) {
        ParamCode::Accepted(_) => Ok(filter),
        ParamCode::WrongCount { expected } => Err(FilterError::Parse {
            offset,
            message: format!(
                "wrong number of arguments: got {}, expected {expected}",
                params.len()
            ),
        }),
        ParamCode::BadValue { index } => Err(FilterError::Parse {
            offset,
            message: format!("argument {} out of range", index + 1),
        }),
    }
}

fn default_table() -> HashMap<String, FilterConstructor> {
    let mut table: HashMap<String, FilterConstructor> = HashMap::new();

    table.insert("BW".into(), |args, off| {
        configure(Box::new(Butterworth::bandpass(3, 0.7, 2.0)), args, off)
    });
    table.insert("BW_BP".into(), |args, off| {
        configure(Box::new(Butterworth::bandpass(3, 0.7, 2.0)), args, off)
    });
    table.insert("BW_LP".into(), |args, off| {
        configure(Box::new(Butterworth::lowpass(3, 0.7)), args, off)
    });
    table.insert("BW_HP".into(), |args, off| {
        configure(Box::new(Butterworth::highpass(3, 2.0)), args, off)
    });
    table.insert("BW_BS".into(), |args, off| {
        configure(Box::new(Butterworth::bandstop(3, 0.7, 2.0)), args, off)
    });
    table.insert("BW_HLP".into(), |args, off| {
        configure(Box::new(Butterworth::high_lowpass(3, 0.7, 2.0)), args, off)
    });
    table.insert("AVG".into(), |args, off| {
        configure(Box::new(Average::new(1.0)), args, off)
    });
    table.insert("MIN".into(), |args, off| {
        configure(Box::new(min_filter(1.0)), args, off)
    });
    table.insert("MAX".into(), |args, off| {
        configure(Box::new(max_filter(1.0)), args, off)
    });
    table.insert("CUTOFF".into(), |args, off| {
        configure(Box::new(CutOff::new(0.0)), args, off)
    });
    table.insert("STALTA".into(), |args, off| {
        configure(Box::new(StaLta::new(2.0, 50.0)), args, off)
    });
    table.insert("STALTA2".into(), |args, off| {
        configure(Box::new(StaLta2::new(2.0, 50.0, 3.0, 1.0)), args, off)
    });
    table.insert("RUD".into(), |args, off| {
        configure(Box::new(RandomUniform::new(-1.0, 1.0)), args, off)
    });
    table.insert("RND".into(), |args, off| {
        configure(Box::new(RandomNormal::new(0.0, 1.0)), args, off)
    });
    table.insert("BPENV".into(), |args, off| {
        configure(Box::new(BandPassEnvelope::new(1.0)), args, off)
    });
    table.insert("RES".into(), |args, off| {
        configure(Box::new(Restitution::new(1.0, 1.0, 1.0)), args, off)
    });
    table.insert("RMHP".into(), |args, off| {
        configure(Box::new(RunningMeanHighpass::new(10.0)), args, off)
    });
    table.insert("ITAPER".into(), |args, off| {
        configure(Box::new(InitialTaper::new(30.0, 0.0)), args, off)
    });
    table.insert("SELF".into(), |args, off| {
        configure(Box::new(SelfFilter), args, off)
    });
    table.insert("WA".into(), |args, off| {
        configure(
            Box::new(SimulationFilter::wood_anderson(GroundMotion::Velocity)),
            args,
            off,
        )
    });
    table.insert("SM5".into(), |args, off| {
        configure(
            Box::new(SimulationFilter::seismometer_5sec(GroundMotion::Velocity)),
            args,
            off,
        )
    });
    table.insert("DEMUX".into(), |mut args, off| {
        if args.len() != 1 {
            return Err(FilterError::Parse {
                offset: off,
                message: "DEMUX takes exactly one filter argument".into(),
            });
        }
        match args.remove(0) {
            FilterArg::Filter(template) => Ok(Box::new(DemuxFilter::new(template))),
            FilterArg::Number(_) => Err(FilterError::Parse {
                offset: off,
                message: "DEMUX takes a filter expression, not a number".into(),
            }),
        }
    });

    table
}

// ---------------------------------------------------------------------------
// Recursive-descent parser

struct Cursor<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn starts_chain_op(&self) -> bool {
        self.chars.get(self.pos) == Some(&'>') && self.chars.get(self.pos + 1) == Some(&'>')
    }

    fn parse_chain(&mut self) -> FilterResult<Box<dyn Filter>> {
        let mut filters = vec![self.parse_primitive()?];
        loop {
            self.skip_whitespace();
            if self.starts_chain_op() {
                self.pos += 2;
                filters.push(self.parse_primitive()?);
            } else {
                break;
            }
        }
        if filters.len() == 1 {
            Ok(filters.pop().expect("one element"))
        } else {
            let mut chain = ChainFilter::new();
            for f in filters {
                chain.add(f);
            }
            Ok(Box::new(chain))
        }
    }

    fn parse_primitive(&mut self) -> FilterResult<Box<dyn Filter>> {
        self.skip_whitespace();
        let name_start = self.pos;
        let name = self.parse_name()?;

        self.skip_whitespace();
        let args = if self.peek() == Some('(') {
            self.bump();
            let args = self.parse_args()?;
            self.skip_whitespace();
            match self.bump() {
                Some(')') => args,
                _ => {
                    return Err(FilterError::Parse {
                        offset: self.pos.min(self.chars.len()),
                        message: "expected ')'".into(),
                    })
                }
            }
        } else {
            Vec::new()
        };

        let ctor = registry()
            .read()
            .get(&name.to_uppercase())
            .copied()
            .ok_or(FilterError::UnknownFilter {
                name: name.clone(),
                offset: name_start,
            })?;
        ctor(args, name_start)
    }

    fn parse_name(&mut self) -> FilterResult<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        if self.pos == start || !self.chars[start].is_ascii_alphabetic() {
            return Err(FilterError::Parse {
                offset: start,
                message: "expected a filter name".into(),
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_args(&mut self) -> FilterResult<Vec<FilterArg>> {
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            if args.is_empty() && self.peek() == Some(')') {
                break; // empty argument list
            }
            let arg = if self
                .peek()
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == '.')
            {
                FilterArg::Number(self.parse_number()?)
            } else {
                FilterArg::Filter(self.parse_chain()?)
            };
            args.push(arg);

            self.skip_whitespace();
            if self.peek() == Some(',') {
                self.bump();
            } else {
                break;
            }
        }
        Ok(args)
    }

    fn parse_number(&mut self) -> FilterResult<f64> {
        let start = self.pos;
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.pos += 1;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let slice: String = self.chars[start..self.pos].iter().collect();
        slice.parse::<f64>().map_err(|_| FilterError::Parse {
            offset: start,
            message: format!("invalid number '{slice}'"),
        })
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cursor at {} in {:?}", self.pos, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_of_two() {
        let filter = parse_filter("BW(4,0.5,5)>>STALTA(1,60)").unwrap();
        let chain = filter
            .as_any()
            .downcast_ref::<ChainFilter>()
            .expect("chain expected");
        assert_eq!(chain.filter_count(), 2);

        let bw = chain.filters()[0]
            .as_any()
            .downcast_ref::<Butterworth>()
            .expect("butterworth expected");
        assert_eq!(bw.params(), (4, 0.5, 5.0));

        let stalta = chain.filters()[1]
            .as_any()
            .downcast_ref::<StaLta>()
            .expect("stalta expected");
        assert_eq!(stalta.lengths(), (1.0, 60.0));
    }

    #[test]
    fn test_unknown_name_offset() {
        match parse_filter("UNKNOWN(1)") {
            Err(FilterError::UnknownFilter { name, offset }) => {
                assert_eq!(name, "UNKNOWN");
                assert_eq!(offset, 0);
            }
            other => panic!("expected UnknownFilter, got {other:?}"),
        }
        match parse_filter("BW(4,0.5,5)>>NOPE(1)") {
            Err(FilterError::UnknownFilter { offset, .. }) => assert_eq!(offset, 13),
            other => panic!("expected UnknownFilter, got {other:?}"),
        }
    }

    #[test]
    fn test_case_insensitive_and_whitespace() {
        let filter = parse_filter("  bw ( 4 , 0.5 , 5 ) ").unwrap();
        let bw = filter
            .as_any()
            .downcast_ref::<Butterworth>()
            .expect("butterworth expected");
        assert_eq!(bw.params(), (4, 0.5, 5.0));
    }

    #[test]
    fn test_bare_name_keeps_defaults() {
        let filter = parse_filter("STALTA").unwrap();
        let stalta = filter.as_any().downcast_ref::<StaLta>().unwrap();
        assert_eq!(stalta.lengths(), (2.0, 50.0));
    }

    #[test]
    fn test_wrong_argument_count() {
        assert!(matches!(
            parse_filter("AVG(1,2)"),
            Err(FilterError::Parse { .. })
        ));
    }

    #[test]
    fn test_nested_filter_argument() {
        let filter = parse_filter("DEMUX(BW(4,0.5,5))").unwrap();
        assert!(filter.as_any().downcast_ref::<DemuxFilter>().is_some());
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(matches!(
            parse_filter("SELF)"),
            Err(FilterError::Parse { .. })
        ));
    }

    #[test]
    fn test_scientific_notation() {
        let filter = parse_filter("CUTOFF(1.5e3)").unwrap();
        let cutoff = filter.as_any().downcast_ref::<CutOff>().unwrap();
        assert_eq!(cutoff.threshold(), 1500.0);
    }

    #[test]
    fn test_custom_registration() {
        register_filter("NULLFILT", |args, off| {
            configure(Box::new(SelfFilter), args, off)
        });
        assert!(parse_filter("nullfilt").is_ok());
    }
}
