//! Managed resource types of the compute API

pub mod security_application;
pub mod security_list;
pub mod security_protocol;
pub mod ssh_key;

use crate::wire::WireSpec;
use opcflow_reconcile::{Attributes, ResourceDescriptor, TypedResource, ValidationError};

pub use security_application::SecurityApplication;
pub use security_list::SecurityList;
pub use security_protocol::SecurityProtocol;
pub use ssh_key::{SshKey, SshKeyInfo, lookup_ssh_key};

/// String-valued enum whose spellings double as the descriptor's allowed set
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(if s.eq_ignore_ascii_case($value) {
                    return Ok($name::$variant);
                })+
                Err(ValidationError::NotAllowed {
                    field: stringify!($name).to_string(),
                    value: s.to_string(),
                    allowed: Self::VALUES.join(", "),
                })
            }
        }
    };
}

string_enum! {
    /// IP protocol of a security application or protocol
    IpProtocol {
        All => "all",
        Ah => "ah",
        Esp => "esp",
        Icmp => "icmp",
        Icmpv6 => "icmpv6",
        Igmp => "igmp",
        Ipip => "ipip",
        Gre => "gre",
        Mplsip => "mplsip",
        Ospf => "ospf",
        Pim => "pim",
        Rdp => "rdp",
        Sctp => "sctp",
        Tcp => "tcp",
        Udp => "udp",
    }
}

string_enum! {
    /// Inbound or outbound policy of a security list
    Policy {
        Deny => "deny",
        Permit => "permit",
        Reject => "reject",
    }
}

string_enum! {
    IcmpType {
        Echo => "echo",
        Reply => "reply",
        Ttl => "ttl",
        Traceroute => "traceroute",
        Unreachable => "unreachable",
    }
}

string_enum! {
    IcmpCode {
        Admin => "admin",
        Df => "df",
        Host => "host",
        Network => "network",
        Port => "port",
        Protocol => "protocol",
    }
}

/// Parse an enum-valued field, reporting errors against that field
pub(crate) fn parse_enum<T>(field: &str, value: &str) -> Result<T, ValidationError>
where
    T: std::str::FromStr<Err = ValidationError>,
{
    value.parse().map_err(|e| match e {
        ValidationError::NotAllowed { value, allowed, .. } => ValidationError::NotAllowed {
            field: field.to_string(),
            value,
            allowed,
        },
        other => other,
    })
}

/// Resource type managed by opcflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    SecurityList,
    SecurityApplication,
    SecurityProtocol,
    SshKey,
}

impl ResourceKind {
    /// Order in which resources are created; deletion runs in reverse
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::SshKey,
        ResourceKind::SecurityProtocol,
        ResourceKind::SecurityApplication,
        ResourceKind::SecurityList,
    ];

    /// Kind name used in state keys
    pub fn as_str(&self) -> &'static str {
        self.descriptor().kind()
    }

    /// Node name in a manifest
    pub fn manifest_name(&self) -> &'static str {
        match self {
            ResourceKind::SecurityList => "security-list",
            ResourceKind::SecurityApplication => "security-application",
            ResourceKind::SecurityProtocol => "security-protocol",
            ResourceKind::SshKey => "ssh-key",
        }
    }

    /// Accepts both `ssh-key` and `ssh_key`
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.manifest_name() == normalized)
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        match self {
            ResourceKind::SecurityList => SecurityList::descriptor(),
            ResourceKind::SecurityApplication => SecurityApplication::descriptor(),
            ResourceKind::SecurityProtocol => SecurityProtocol::descriptor(),
            ResourceKind::SshKey => SshKey::descriptor(),
        }
    }

    /// Validated attributes rendered through the typed configuration
    pub fn typed_attributes(&self, validated: &Attributes) -> Result<Attributes, ValidationError> {
        Ok(match self {
            ResourceKind::SecurityList => SecurityList::from_attributes(validated)?.to_attributes(),
            ResourceKind::SecurityApplication => {
                SecurityApplication::from_attributes(validated)?.to_attributes()
            }
            ResourceKind::SecurityProtocol => {
                SecurityProtocol::from_attributes(validated)?.to_attributes()
            }
            ResourceKind::SshKey => SshKey::from_attributes(validated)?.to_attributes(),
        })
    }

    pub fn wire(&self) -> &'static WireSpec {
        match self {
            ResourceKind::SecurityList => &security_list::WIRE,
            ResourceKind::SecurityApplication => &security_application::WIRE,
            ResourceKind::SecurityProtocol => &security_protocol::WIRE,
            ResourceKind::SshKey => &ssh_key::WIRE,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.manifest_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(ResourceKind::parse("ssh-key"), Some(ResourceKind::SshKey));
        assert_eq!(
            ResourceKind::parse("security_list"),
            Some(ResourceKind::SecurityList)
        );
        assert_eq!(ResourceKind::parse("instance"), None);
    }

    #[test]
    fn test_kind_matches_descriptor() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str(), kind.manifest_name().replace('-', "_"));
        }
    }

    #[test]
    fn test_string_enum_parse_is_case_insensitive() {
        assert_eq!("TCP".parse::<IpProtocol>().unwrap(), IpProtocol::Tcp);
        assert_eq!("Permit".parse::<Policy>().unwrap(), Policy::Permit);
        assert!(matches!(
            "allow".parse::<Policy>(),
            Err(ValidationError::NotAllowed { .. })
        ));
    }
}
