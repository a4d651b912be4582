//! Domain definitions.

pub mod appointment;
pub mod shop;
pub mod treatment;
pub mod user;

pub use self::{
    appointment::Appointment, shop::Shop, treatment::Treatment, user::User,
};

/// Defines a free-form text newtype bounded by the provided maximum length.
///
/// Defined type rejects empty values and values surrounded by whitespace.
macro_rules! define_text {
    (
        #[doc = $doc:literal]
        $name:ident(max_len = $max:literal)
    ) => {
        #[doc = $doc]
        #[derive(
            ::derive_more::AsRef,
            Clone,
            Debug,
            ::derive_more::Display,
            Eq,
            PartialEq,
        )]
        #[as_ref(str, String)]
        #[cfg_attr(
            feature = "postgres",
            derive(::postgres_types::FromSql, ::postgres_types::ToSql),
            postgres(transparent)
        )]
        pub struct $name(String);

        impl $name {
            #[doc = ::core::concat!(
                "Creates a new [`", ::core::stringify!($name),
                "`] if the given `value` is valid.",
            )]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                Self::check(&value).then_some(Self(value))
            }

            #[doc = ::core::concat!(
                "Checks whether the given `value` is a valid [`",
                ::core::stringify!($name), "`].",
            )]
            fn check(value: impl AsRef<str>) -> bool {
                let value = value.as_ref();
                value.trim() == value && !value.is_empty() && value.len() <= $max
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s).ok_or(::core::concat!(
                    "invalid `", ::core::stringify!($name), "`",
                ))
            }
        }
    };
}
use define_text;
