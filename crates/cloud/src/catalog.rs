//! Static launch catalogs: OS images, instance types and the AI-workload check.

use std::fmt;
use std::str::FromStr;

use crate::providers::CloudError;

/// CPU architecture of an EC2 image / instance type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Architecture {
    #[default]
    X86_64,
    Arm64,
}

impl Architecture {
    /// Value used by the `architecture` image filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            other => Err(CloudError::Config(format!("unknown architecture '{other}'"))),
        }
    }
}

/// An OS family resolved to its newest AMI at launch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsImage {
    pub name: &'static str,
    /// Publishing account.
    pub owner: &'static str,
    /// `name` filter pattern.
    pub pattern: &'static str,
}

/// Images offered in the create flow, in menu order.
pub const OS_IMAGES: &[OsImage] = &[
    OsImage {
        name: "Debian 12",
        owner: "136693071363",
        pattern: "debian-12-*",
    },
    OsImage {
        name: "Debian 11",
        owner: "136693071363",
        pattern: "debian-11-*",
    },
    OsImage {
        name: "Ubuntu 24.04",
        owner: "099720109477",
        pattern: "ubuntu/images/hvm-ssd-gp3/ubuntu-noble-24.04-*",
    },
    OsImage {
        name: "Ubuntu 22.04",
        owner: "099720109477",
        pattern: "ubuntu/images/hvm-ssd/ubuntu-jammy-22.04-*",
    },
    OsImage {
        name: "Amazon Linux 2023",
        owner: "137112412989",
        pattern: "al2023-ami-2023.*",
    },
    OsImage {
        name: "Amazon Linux 2",
        owner: "137112412989",
        pattern: "amzn2-ami-hvm-*",
    },
];

/// Amazon Linux 2023, used by the starter EC2 task.
pub const AMAZON_LINUX_2023: OsImage = OS_IMAGES[4];

/// An instance type row of the create menu.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceTypeOption {
    pub instance_type: String,
    pub vcpus: u32,
    pub ram_gib: f64,
    /// On-demand reference price in us-east-1.
    pub price: &'static str,
    pub description: &'static str,
    /// Why the type is unfit for AI inference, when known.
    pub ai_reason: Option<&'static str>,
}

impl InstanceTypeOption {
    /// A type typed in by hand. Assumes 2 vCPU / 4 GiB.
    #[must_use]
    pub fn manual(instance_type: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            vcpus: 2,
            ram_gib: 4.0,
            price: "-",
            description: "manual entry",
            ai_reason: None,
        }
    }
}

const TINY_RAM: &str = "Too little memory to run a model";
const SMALL_QUANTIZED: &str = "Only fits tiny quantized models";
const LOW_RAM: &str = "Low memory";

struct TypeRow(&'static str, u32, f64, &'static str, &'static str, Option<&'static str>);

const X86_TYPES: &[TypeRow] = &[
    TypeRow("t2.micro", 1, 1.0, "$0.0116/h", "T2 free tier", Some(TINY_RAM)),
    TypeRow("t3.micro", 2, 1.0, "$0.0104/h", "T3 free tier", Some(TINY_RAM)),
    TypeRow("t3.medium", 2, 4.0, "$0.0416/h", "T3 general purpose", Some(SMALL_QUANTIZED)),
    TypeRow("t3.xlarge", 4, 16.0, "$0.1664/h", "T3 general purpose, large", None),
    TypeRow("c6i.large", 2, 4.0, "$0.0850/h", "Compute optimized (AVX-512)", Some(LOW_RAM)),
    TypeRow("c6i.4xlarge", 16, 32.0, "$0.6800/h", "High performance compute (16 vCPU)", None),
    TypeRow("c7i.large", 2, 4.0, "$0.0895/h", "AI inference (AMX)", Some(LOW_RAM)),
    TypeRow("c7i.4xlarge", 16, 32.0, "$0.7160/h", "AI high performance (16 vCPU)", None),
    TypeRow("m6i.large", 2, 8.0, "$0.0960/h", "General purpose / AI inference", None),
    TypeRow("m7i.large", 2, 8.0, "$0.1008/h", "General purpose / AI inference (AMX)", None),
];

const ARM_TYPES: &[TypeRow] = &[
    TypeRow("t4g.nano", 2, 0.5, "$0.0042/h", "Graviton2", Some(TINY_RAM)),
    TypeRow("t4g.micro", 2, 1.0, "$0.0084/h", "T4g free trial", Some(TINY_RAM)),
    TypeRow("t4g.medium", 2, 4.0, "$0.0336/h", "T4g general purpose", Some(SMALL_QUANTIZED)),
    TypeRow("c7g.large", 2, 4.0, "$0.0723/h", "AI inference (BF16)", Some(LOW_RAM)),
    TypeRow("c7g.xlarge", 4, 8.0, "$0.1445/h", "AI inference (BF16)", None),
    TypeRow("c7g.4xlarge", 16, 32.0, "$0.5780/h", "AI high performance (16 vCPU)", None),
    TypeRow("m7g.large", 2, 8.0, "$0.0816/h", "General purpose / AI (BF16)", None),
];

/// Instance types offered for `arch`, in menu order.
#[must_use]
pub fn instance_types(arch: Architecture) -> Vec<InstanceTypeOption> {
    let rows = match arch {
        Architecture::X86_64 => X86_TYPES,
        Architecture::Arm64 => ARM_TYPES,
    };
    rows.iter()
        .map(|row| InstanceTypeOption {
            instance_type: row.0.to_string(),
            vcpus: row.1,
            ram_gib: row.2,
            price: row.3,
            description: row.4,
            ai_reason: row.5,
        })
        .collect()
}

/// Minimum memory for running a modern LLM.
pub const AI_MIN_RAM_GIB: f64 = 8.0;

/// Result of the AI-workload check.
#[derive(Debug, Clone, PartialEq)]
pub enum AiSuitability {
    Suitable,
    /// Catalog marks the type as unfit.
    Unsuitable { reason: String },
    /// Memory below [`AI_MIN_RAM_GIB`].
    LowMemory { ram_gib: f64 },
}

impl AiSuitability {
    #[must_use]
    pub fn is_suitable(&self) -> bool {
        matches!(self, Self::Suitable)
    }
}

/// Judge whether `option` can run AI inference.
#[must_use]
pub fn ai_suitability(option: &InstanceTypeOption) -> AiSuitability {
    if let Some(reason) = option.ai_reason {
        AiSuitability::Unsuitable {
            reason: reason.to_string(),
        }
    } else if option.ram_gib < AI_MIN_RAM_GIB {
        AiSuitability::LowMemory {
            ram_gib: option.ram_gib,
        }
    } else {
        AiSuitability::Suitable
    }
}

/// Build EC2 user data from an optional root password and operator script.
///
/// Returns `None` when there is nothing to run.
#[must_use]
pub fn launch_user_data(root_password: Option<&str>, script: Option<&str>) -> Option<String> {
    let script = script.map(str::trim_end).filter(|s| !s.is_empty());
    let Some(password) = root_password.filter(|p| !p.is_empty()) else {
        return script.map(ToString::to_string);
    };

    let mut data = format!("#!/bin/bash\necho \"root:{password}\" | chpasswd\n");
    data.push_str("sed -i 's/^#PermitRootLogin.*/PermitRootLogin yes/' /etc/ssh/sshd_config\n");
    data.push_str(
        "sed -i 's/^#PasswordAuthentication.*/PasswordAuthentication yes/' /etc/ssh/sshd_config\n",
    );
    data.push_str("service sshd restart\n");
    if let Some(script) = script {
        data.push('\n');
        data.push_str(script);
        data.push('\n');
    }
    Some(data)
}
