//! Coordination endpoint URI.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ProviderError;

/// Parsed `scheme://host:port[,host:port...][/chroot][?key=value&...]` URI.
///
/// The host list is kept verbatim; it is handed to the provider as a
/// connect string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUri {
    scheme: String,
    hosts: Vec<String>,
    chroot: Option<String>,
    params: BTreeMap<String, String>,
}

impl ProviderUri {
    /// Lower-cased scheme, e.g. `zookeeper` or `memory`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host entries in the order given.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Optional chroot path, always starting with `/`.
    pub fn chroot(&self) -> Option<&str> {
        self.chroot.as_deref()
    }

    /// Looks up a query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Hosts joined with `,` followed by the chroot, in the form
    /// coordination clients accept.
    pub fn connect_string(&self) -> String {
        let mut out = self.hosts.join(",");
        if let Some(chroot) = &self.chroot {
            out.push_str(chroot);
        }
        out
    }
}

impl FromStr for ProviderUri {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| ProviderError::InvalidUri(s.to_owned()))?;

        let valid_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(ProviderError::InvalidUri(s.to_owned()));
        }

        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };

        let (authority, chroot) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx..])),
            None => (rest, None),
        };

        let hosts = authority
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_owned)
            .collect();

        let chroot = chroot
            .map(|c| c.trim_end_matches('/'))
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        let params = query
            .into_iter()
            .flat_map(|q| q.split('&'))
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_owned(), v.to_owned()),
                None => (pair.to_owned(), String::new()),
            })
            .collect();

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            hosts,
            chroot,
            params,
        })
    }
}

impl fmt::Display for ProviderUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.connect_string())?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}
