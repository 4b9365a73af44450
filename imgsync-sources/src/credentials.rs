//! Registry vendor credential lookup.
//!
//! A reference is matched against a fixed table of host patterns; the first
//! match decides which configured credential (if any) a transport passes to
//! the source registry. References without a registry host are Docker Hub
//! images.

use regex::Regex;

use imgsync_core::{ImageRef, Secret, SourceError, VendorCredentials};

const DOCKER_HUB: &str = "docker.io";

/// One row of the lookup table.
#[derive(Debug, Clone)]
pub struct CredentialProfile {
    pub name: &'static str,
    /// Host used for `docker login`.
    pub login_host: &'static str,
    pattern: Regex,
    credential: Option<Secret>,
}

impl CredentialProfile {
    pub fn credential(&self) -> Option<&Secret> {
        self.credential.as_ref().filter(|secret| !secret.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct CredentialProfiles {
    profiles: Vec<CredentialProfile>,
}

impl CredentialProfiles {
    pub fn new(credentials: &VendorCredentials) -> Result<Self, SourceError> {
        let table: [(&'static str, &'static str, &str, Option<&Secret>); 6] = [
            (DOCKER_HUB, DOCKER_HUB, r"^[a-z0-9.-]*docker\.io/", credentials.docker.as_ref()),
            ("docker.elastic.co", "docker.elastic.co", r"^docker\.elastic\.co/", None),
            ("public.ecr.aws", "public.ecr.aws", r"^public\.ecr\.aws/", None),
            ("ghcr.io", "ghcr.io", r"^[a-z0-9.-]*ghcr\.io/", None),
            ("quay.io", "quay.io", r"^[a-z0-9.-]*quay\.io/", credentials.quay.as_ref()),
            ("gcr", "gcr.io", r"^[a-z0-9.-]*gcr\.io/", credentials.gcr.as_ref()),
        ];

        let profiles = table
            .into_iter()
            .map(|(name, login_host, pattern, credential)| {
                let pattern = Regex::new(pattern)
                    .map_err(|e| SourceError::Invalid(format!("credential pattern {name}: {e}")))?;
                Ok(CredentialProfile {
                    name,
                    login_host,
                    pattern,
                    credential: credential.cloned(),
                })
            })
            .collect::<Result<Vec<_>, SourceError>>()?;

        Ok(Self { profiles })
    }

    /// The profile governing `image`, or `None` for an unknown registry host.
    pub fn profile_for(&self, image: &ImageRef) -> Option<&CredentialProfile> {
        if image.registry_host().is_none() {
            return self.profiles.iter().find(|p| p.name == DOCKER_HUB);
        }
        let reference = image.to_string();
        self.profiles.iter().find(|p| p.pattern.is_match(&reference))
    }

    /// The credential to present when pulling `image`, if one is configured.
    pub fn credential_for(&self, image: &ImageRef) -> Option<&Secret> {
        self.profile_for(image).and_then(CredentialProfile::credential)
    }
}
