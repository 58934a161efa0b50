//! Enumerated column types.
//!
//! Every lifecycle field (role, status, stage, priority) is stored as a
//! `SMALLINT` and exposed to JSON as a snake_case string. The set of values is
//! fixed here; the store never accepts anything outside it.

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::SmallInt;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        $name:ident default $default:ident {
            $($variant:ident = $value:literal => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = SmallInt)]
        #[serde(rename_all = "snake_case")]
        #[repr(i16)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl ToSql<SmallInt, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                let v = *self as i16;
                out.write_all(&v.to_be_bytes())?;
                Ok(serialize::IsNull::No)
            }
        }

        impl FromSql<SmallInt, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let value = i16::from_sql(bytes)?;
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(format!("Unknown {}: {}", stringify!($name), value).into()),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!("Unknown {}: {}", stringify!($name), s)),
                }
            }
        }
    };
}

db_enum! {
    /// Account role; drives module access.
    UserRole default Employee {
        Admin = 0 => "admin",
        Manager = 1 => "manager",
        Hr = 2 => "hr",
        Sales = 3 => "sales",
        Support = 4 => "support",
        Employee = 5 => "employee",
    }
}

db_enum! {
    LeadStatus default New {
        New = 0 => "new",
        Contacted = 1 => "contacted",
        Qualified = 2 => "qualified",
        Proposal = 3 => "proposal",
        Negotiation = 4 => "negotiation",
        ClosedWon = 5 => "closed_won",
        ClosedLost = 6 => "closed_lost",
    }
}

db_enum! {
    /// Sales pipeline stage of a deal. Declaration order is pipeline order.
    DealStage default Prospecting {
        Prospecting = 0 => "prospecting",
        Qualification = 1 => "qualification",
        Proposal = 2 => "proposal",
        Negotiation = 3 => "negotiation",
        ClosedWon = 4 => "closed_won",
        ClosedLost = 5 => "closed_lost",
    }
}

db_enum! {
    EmployeeStatus default Active {
        Active = 0 => "active",
        Inactive = 1 => "inactive",
        OnLeave = 2 => "on_leave",
        Terminated = 3 => "terminated",
    }
}

db_enum! {
    LeaveStatus default Pending {
        Pending = 0 => "pending",
        Approved = 1 => "approved",
        Rejected = 2 => "rejected",
        Cancelled = 3 => "cancelled",
    }
}

db_enum! {
    ProjectStatus default Planning {
        Planning = 0 => "planning",
        Active = 1 => "active",
        OnHold = 2 => "on_hold",
        Completed = 3 => "completed",
        Cancelled = 4 => "cancelled",
    }
}

db_enum! {
    TaskStatus default Todo {
        Todo = 0 => "todo",
        InProgress = 1 => "in_progress",
        Review = 2 => "review",
        Completed = 3 => "completed",
        Cancelled = 4 => "cancelled",
    }
}

db_enum! {
    Priority default Medium {
        Low = 0 => "low",
        Medium = 1 => "medium",
        High = 2 => "high",
        Urgent = 3 => "urgent",
    }
}

db_enum! {
    ActivityType default Note {
        Call = 0 => "call",
        Email = 1 => "email",
        Meeting = 2 => "meeting",
        Task = 3 => "task",
        Note = 4 => "note",
    }
}

impl DealStage {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ClosedWon | Self::ClosedLost)
    }
}

impl TaskStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }
}
