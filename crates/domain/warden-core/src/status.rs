//! Status codes normalized once at the reconciliation boundary.
//!
//! The remote API reports some states as strings and others as integers. Each
//! enum here is stored as its integer code; unrecognized strings become
//! `Unknown` (code 0) and integers outside the known set are kept as `Other`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

macro_rules! status_code {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = $code:literal => [$($label:literal),+ $(,)?]),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(from = "i64", into = "i64")]
        pub enum $name {
            #[default]
            Unknown,
            $($variant,)+
            Other(i64),
        }

        impl $name {
            pub fn code(self) -> i64 {
                match self {
                    Self::Unknown => 0,
                    $(Self::$variant => $code,)+
                    Self::Other(code) => code,
                }
            }

            pub fn from_label(label: &str) -> Self {
                let label = label.trim();
                $(
                    if [$($label),+].iter().any(|l| l.eq_ignore_ascii_case(label)) {
                        return Self::$variant;
                    }
                )+
                Self::Unknown
            }

            pub fn from_value(value: &Value) -> Self {
                match value {
                    Value::Number(n) => n.as_i64().map(Self::from).unwrap_or_default(),
                    Value::String(s) => match s.trim().parse::<i64>() {
                        Ok(code) => Self::from(code),
                        Err(_) => Self::from_label(s),
                    },
                    Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => {
                        Self::Unknown
                    }
                }
            }

            pub fn from_optional(value: Option<&Value>) -> Self {
                value.map(Self::from_value).unwrap_or_default()
            }
        }

        impl From<i64> for $name {
            fn from(code: i64) -> Self {
                match code {
                    0 => Self::Unknown,
                    $($code => Self::$variant,)+
                    other => Self::Other(other),
                }
            }
        }

        impl From<$name> for i64 {
            fn from(status: $name) -> i64 {
                status.code()
            }
        }
    };
}

status_code! {
    /// Lifecycle state of a managed endpoint.
    EndpointStatus {
        Active = 1 => ["active", "online"],
        Pending = 2 => ["pending"],
        Suspended = 3 => ["suspended", "disabled"],
    }
}

status_code! {
    AccountStatus {
        Active = 1 => ["active", "enabled"],
        Pending = 2 => ["pending", "invited"],
        Suspended = 3 => ["suspended", "disabled"],
    }
}

status_code! {
    CompanyStatus {
        Active = 1 => ["active"],
        Suspended = 2 => ["suspended"],
    }
}

status_code! {
    /// Pending action on a quarantined file.
    QuarantineActionStatus {
        NoAction = 1 => ["none", "no_action"],
        PendingRestore = 2 => ["pending_restore", "restore"],
        PendingRemoval = 3 => ["pending_removal", "remove"],
        Failed = 4 => ["failed"],
    }
}

status_code! {
    ScanTaskStatus {
        Pending = 1 => ["pending"],
        InProgress = 2 => ["in_progress", "in-progress", "running"],
        Finished = 3 => ["finished", "done", "completed"],
    }
}
