/// Macro to create a configuration value group struct.
///
/// Usage:
/// ```rust
/// mod upload {
///     upload_config::config_group!({
///         ref retries: usize = 0;
///         ref label: String = "default".to_string();
///     });
/// }
///
/// let group = upload::ConfigValueGroup::new();
/// assert_eq!(group.retries, 0);
/// ```
///
/// This creates a `ConfigValueGroup` struct with the specified fields.  `new()` holds the
/// defaults and `apply_env_overrides()` loads values from environment variables named
/// `VAULT_UPLOAD_<MODULE>_<FIELD>`, where `<MODULE>` is the last segment of the invoking
/// module's path.
#[macro_export]
macro_rules! config_group {
    ({
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $value:expr;
        )+
    }) => {
        #[allow(unused_imports)]
        use $crate::ParsableConfigValue;

        /// ConfigValueGroup struct containing all configurable values
        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                #[allow(non_snake_case)]
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            /// Create a new instance with default values only (no environment variable overrides).
            fn default() -> Self {
                Self {
                    $(
                        $name: {
                            let v: $type = $value;
                            v
                        },
                    )+
                }
            }
        }

        impl ConfigValueGroup {
            /// Alias for `Default::default()`.
            pub fn new() -> Self {
                Self::default()
            }

            /// The environment variable consulted for a field of this group.
            pub fn env_var_name(field: &str) -> String {
                let group_name = module_path!().split("::").last().unwrap_or("unknown");
                format!("{}_{}_{}", $crate::ENV_PREFIX, group_name.to_uppercase(), field.to_uppercase())
            }

            /// Apply environment variable overrides to this configuration group.
            pub fn apply_env_overrides(&mut self) {
                $(
                    let env_var_name = Self::env_var_name(stringify!($name));
                    let maybe_env_value = std::env::var(&env_var_name).ok();
                    let default_value: $type = $value;
                    self.$name = <$type>::parse(stringify!($name), maybe_env_value, default_value);
                )+
            }
        }
    };
}
