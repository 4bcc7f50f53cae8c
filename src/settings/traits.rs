use miette::Result;

/// A settings table as deserialized from TOML, which still has to be
/// validated into its `Resolved` form.
///
/// The `Context` is whatever the table needs from tables resolved before it:
/// the settings file location for `[base_paths]`, the base paths for the rest.
pub trait ResolvableSettings {
    type Context;
    type Resolved;

    fn resolve(self, context: Self::Context) -> Result<Self::Resolved>;
}
