//! Enum-indexed overlay: binds a dense, contiguous enumeration of counter
//! names to matrix column indices (spec §4.4).
//!
//! An enum becomes usable as a counter schema either by hand-implementing
//! [`CounterSchema`], or — the common path — via the [`counter_schema!`]
//! macro, which generates both the enum and the trait implementation from a
//! compact declaration. This is the "compile-time macro over the enum"
//! option spec.md §9 calls out, chosen because the teacher crate has no
//! proc-macro dependency in its graph to build on.

use std::sync::{Arc, OnceLock};

use crate::error::{CounterError, Result};

/// Whether a counter accumulates a plain integer or tick-accumulating
/// stopwatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    /// A plain additive integer accumulator.
    Numeric,
    /// A tick accumulator paired with an implicit call count.
    Stopwatch,
}

/// The resolved, validated metadata for one enum bound as a counter schema:
/// per-column type tags, display names, and the discriminant offset used to
/// map an enum member to a column index.
pub struct SchemaTable {
    pub(crate) kinds: Vec<CounterKind>,
    pub(crate) names: Vec<&'static str>,
    pub(crate) offset: i64,
}

impl SchemaTable {
    /// Number of declared counters (matrix columns).
    pub(crate) fn columns(&self) -> u16 {
        self.kinds.len() as u16
    }

    fn build<E: CounterSchema>() -> Result<Self> {
        let raw = E::__raw_members();
        if raw.is_empty() {
            return Err(CounterError::InvalidCounterSchema {
                reason: "enum has no members".to_string(),
            });
        }
        if raw.len() > u16::MAX as usize {
            return Err(CounterError::InvalidCounterSchema {
                reason: format!(
                    "{} members exceeds the 16-bit counter id space",
                    raw.len()
                ),
            });
        }

        let mut discriminants: Vec<i64> = raw.iter().map(|(m, _, _)| m.__discriminant()).collect();
        discriminants.sort_unstable();
        for window in discriminants.windows(2) {
            if window[1] != window[0] + 1 {
                return Err(CounterError::InvalidCounterSchema {
                    reason: "enum discriminants are not dense (gap or duplicate)".to_string(),
                });
            }
        }
        let offset = discriminants[0];

        let mut kinds = vec![CounterKind::Numeric; raw.len()];
        let mut names = vec![""; raw.len()];
        for (member, kind, name) in raw {
            let column = (member.__discriminant() - offset) as usize;
            kinds[column] = *kind;
            names[column] = name;
        }

        Ok(SchemaTable {
            kinds,
            names,
            offset,
        })
    }
}

/// Implemented by enums usable as a counter collection's column schema.
///
/// Most callers should not implement this by hand; use [`counter_schema!`]
/// instead. The `__`-prefixed methods are the macro's implementation detail
/// and are not part of the stable contract.
pub trait CounterSchema: Copy + Eq + 'static {
    /// Every member paired with its declared kind and display name, in
    /// enumeration order.
    #[doc(hidden)]
    fn __raw_members() -> &'static [(Self, CounterKind, &'static str)];

    /// The member's raw integer discriminant (not yet offset-adjusted).
    #[doc(hidden)]
    fn __discriminant(&self) -> i64;

    /// The process-wide, per-enum-type cache cell for this type's schema.
    #[doc(hidden)]
    fn __schema_once() -> &'static OnceLock<Arc<SchemaTable>>;

    /// Lazily builds and validates this enum's schema table, once per
    /// process; subsequent calls return the cached result.
    fn schema() -> Result<Arc<SchemaTable>> {
        if let Some(table) = Self::__schema_once().get() {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(SchemaTable::build::<Self>()?);
        match Self::__schema_once().set(Arc::clone(&table)) {
            Ok(()) => Ok(table),
            Err(_) => Ok(Arc::clone(
                Self::__schema_once().get().expect("set just raced, not failed"),
            )),
        }
    }

    /// This member's column index, given an already-built schema table for
    /// the same enum type.
    fn column(&self, table: &SchemaTable) -> u16 {
        (self.__discriminant() - table.offset) as u16
    }
}

/// Declares an enum and binds it as a counter schema in one step.
///
/// ```ignore
/// counter_schema! {
///     pub enum Phase {
///         Parse => Numeric,
///         Resolve => Numeric,
///         Compile => Stopwatch,
///         Link => Stopwatch("link_time"),
///     }
/// }
/// ```
///
/// Each variant is tagged `Numeric` or `Stopwatch`; an optional parenthesized
/// string literal overrides the display name (default: the variant's own
/// identifier). Variants are assigned dense column indices in declaration
/// order, starting at zero.
#[macro_export]
macro_rules! counter_schema {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident => $kind:ident $(( $display:literal ))? ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant, )+
        }

        impl $name {
            const __MEMBERS: &'static [$name] = &[ $( $name::$variant ),+ ];
        }

        impl $crate::schema::CounterSchema for $name {
            fn __raw_members() -> &'static [(Self, $crate::schema::CounterKind, &'static str)] {
                static TABLE: &[(
                    $name,
                    $crate::schema::CounterKind,
                    &'static str,
                )] = &[
                    $(
                        (
                            $name::$variant,
                            $crate::schema::CounterKind::$kind,
                            $crate::counter_schema!(@name stringify!($variant) $(, $display)?),
                        ),
                    )+
                ];
                TABLE
            }

            fn __discriminant(&self) -> i64 {
                $name::__MEMBERS
                    .iter()
                    .position(|m| m == self)
                    .expect("every value of this enum is one of its own members") as i64
            }

            fn __schema_once() -> &'static ::std::sync::OnceLock<::std::sync::Arc<$crate::schema::SchemaTable>> {
                static CELL: ::std::sync::OnceLock<::std::sync::Arc<$crate::schema::SchemaTable>> =
                    ::std::sync::OnceLock::new();
                &CELL
            }
        }
    };

    (@name $default:expr) => { $default };
    (@name $default:expr, $display:literal) => { $display };
}

#[cfg(test)]
mod tests {
    use super::*;

    counter_schema! {
        pub enum TestPhase {
            Parse => Numeric,
            Compile => Stopwatch,
            Link => Stopwatch("link_time")
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Empty;

    impl CounterSchema for Empty {
        fn __raw_members() -> &'static [(Self, CounterKind, &'static str)] {
            &[]
        }

        fn __discriminant(&self) -> i64 {
            unreachable!("Empty has no instances to call this on")
        }

        fn __schema_once() -> &'static OnceLock<Arc<SchemaTable>> {
            static CELL: OnceLock<Arc<SchemaTable>> = OnceLock::new();
            &CELL
        }
    }

    #[test]
    fn binds_dense_schema() {
        let table = TestPhase::schema().unwrap();
        assert_eq!(table.columns(), 3);
        assert_eq!(table.kinds[0], CounterKind::Numeric);
        assert_eq!(table.kinds[1], CounterKind::Stopwatch);
        assert_eq!(table.kinds[2], CounterKind::Stopwatch);
        assert_eq!(table.names[0], "Parse");
        assert_eq!(table.names[1], "Compile");
        assert_eq!(table.names[2], "link_time");
    }

    #[test]
    fn column_mapping_is_offset_by_declaration_order() {
        let table = TestPhase::schema().unwrap();
        assert_eq!(TestPhase::Parse.column(&table), 0);
        assert_eq!(TestPhase::Compile.column(&table), 1);
        assert_eq!(TestPhase::Link.column(&table), 2);
    }

    #[test]
    fn schema_is_cached() {
        let a = TestPhase::schema().unwrap();
        let b = TestPhase::schema().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn empty_enum_is_rejected() {
        let err = Empty::schema().unwrap_err();
        assert!(matches!(err, CounterError::InvalidCounterSchema { .. }));
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Gappy {
        A,
        B,
    }

    impl CounterSchema for Gappy {
        fn __raw_members() -> &'static [(Self, CounterKind, &'static str)] {
            // Deliberately non-dense: 0 and 2, skipping 1.
            &[
                (Gappy::A, CounterKind::Numeric, "A"),
                (Gappy::B, CounterKind::Numeric, "B"),
            ]
        }

        fn __discriminant(&self) -> i64 {
            match self {
                Gappy::A => 0,
                Gappy::B => 2,
            }
        }

        fn __schema_once() -> &'static OnceLock<Arc<SchemaTable>> {
            static CELL: OnceLock<Arc<SchemaTable>> = OnceLock::new();
            &CELL
        }
    }

    #[test]
    fn non_dense_enum_is_rejected() {
        let err = Gappy::schema().unwrap_err();
        assert!(matches!(err, CounterError::InvalidCounterSchema { .. }));
    }
}
