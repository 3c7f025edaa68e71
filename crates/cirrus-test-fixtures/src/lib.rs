//! Test fixtures for cirrus
//!
//! Representative templates and policies shared by the crate test suites.

use std::fs;
use std::path::{Path, PathBuf};

/// Fixture categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureType {
    /// ECS cluster with Fargate capacity providers, conditions and exports.
    EcsCluster,
    /// VPC and subnets exercising Cidr, GetAZs, Select, Base64 and ImportValue.
    Network,
    /// Two conditions that reference each other.
    CyclicConditions,
    /// Rule policy written against [`FixtureType::EcsCluster`].
    EcsPolicy,
}

impl FixtureType {
    pub fn file_name(self) -> &'static str {
        match self {
            FixtureType::EcsCluster => "ecs_cluster.yaml",
            FixtureType::Network => "network.yaml",
            FixtureType::CyclicConditions => "cyclic_conditions.yaml",
            FixtureType::EcsPolicy => "ecs_policy.yaml",
        }
    }

    pub fn contents(self) -> &'static str {
        match self {
            FixtureType::EcsCluster => include_str!("../templates/ecs_cluster.yaml"),
            FixtureType::Network => include_str!("../templates/network.yaml"),
            FixtureType::CyclicConditions => include_str!("../templates/cyclic_conditions.yaml"),
            FixtureType::EcsPolicy => include_str!("../templates/ecs_policy.yaml"),
        }
    }

    pub fn bytes(self) -> &'static [u8] {
        self.contents().as_bytes()
    }
}

pub fn ecs_cluster() -> &'static str {
    FixtureType::EcsCluster.contents()
}

pub fn network() -> &'static str {
    FixtureType::Network.contents()
}

pub fn cyclic_conditions() -> &'static str {
    FixtureType::CyclicConditions.contents()
}

pub fn ecs_policy() -> &'static str {
    FixtureType::EcsPolicy.contents()
}

/// Fixtures written to a temporary directory, for tests that go through the
/// file loader.
pub struct TestFixtures {
    temp_dir: tempfile::TempDir,
}

impl TestFixtures {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a fixture and return its path.
    pub fn write(&self, fixture: FixtureType) -> std::io::Result<PathBuf> {
        self.write_named(fixture.file_name(), fixture.contents())
    }

    pub fn write_named(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.root().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}

/// List all available fixture names
pub fn list_fixtures() -> Vec<&'static str> {
    [
        FixtureType::EcsCluster,
        FixtureType::Network,
        FixtureType::CyclicConditions,
        FixtureType::EcsPolicy,
    ]
    .iter()
    .map(|f| f.file_name())
    .collect()
}
