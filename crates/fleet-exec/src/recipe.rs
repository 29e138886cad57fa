//! Dockerfile rendering per tag.
use fleet_core::runtime::ImageRecipe;
use fleet_model::{PackageSource, Tag};
use serde::{Deserialize, Serialize};

/// Packages installed for a `deb` tag.
const DEB_PACKAGES: [&str; 3] = ["salt-common", "salt-master", "salt-minion"];

/// Dockerfile built on `<base_repo>:<imageBase>`.
///
/// The base image is expected to carry a source checkout at `source_dir` and
/// prebuilt packages in `deb_dir`; the recipe only selects and installs the
/// requested version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerfileRecipe {
    pub base_repo: String,
    pub source_dir: String,
    pub deb_dir: String,
    pub command: String,
}

impl Default for DockerfileRecipe {
    fn default() -> Self {
        Self {
            base_repo: "ariel/salt".into(),
            source_dir: "/src/salt".into(),
            deb_dir: "/root/salt".into(),
            command: "python /usr/sbin/pupaas.py && /usr/sbin/sshd -D".into(),
        }
    }
}

impl ImageRecipe for DockerfileRecipe {
    fn render(&self, tag: &Tag) -> String {
        let install = match tag.source() {
            PackageSource::Git => format!(
                "RUN cd {} && git fetch --tags && git checkout {} && python ./setup.py install --force",
                self.source_dir,
                tag.version()
            ),
            PackageSource::Deb => {
                let debs: Vec<String> = DEB_PACKAGES
                    .iter()
                    .map(|p| format!("{}/{p}_{}.deb", self.deb_dir, tag.version()))
                    .collect();
                format!("RUN dpkg -i {}", debs.join(" "))
            }
        };
        format!(
            "FROM {}:{}\n{install}\nCMD {}\n",
            self.base_repo,
            tag.image_base(),
            self.command
        )
    }
}
