// Boot-service management: install/remove the unit that reloads zram
// SPDX-License-Identifier: GPL-3.0-or-later
//
// setup copies the running executable to a fixed path and installs a
// boot definition that replays `load` with the given sizing; unsetup
// reverses everything. Both are idempotent. The init system is probed
// once into a closed enum; everything downstream dispatches on it.

use std::path::Path;

use thiserror::Error;

use crate::defaults::{INITD_SCRIPT_PATH, INSTALL_PATH, LEGACY_LOG_PATH, SERVICE_NAME, SYSTEMD_UNIT_PATH};
use crate::exec::{ExecError, Runner};
use crate::sizing::SizingSpec;
use crate::{info, warn};

/// rc.d links for the sysvinit flavour: start late, stop early.
const RC_LINKS: [(&str, &str); 4] = [
    ("/etc/rc2.d", "S99zram-advisor"),
    ("/etc/rc3.d", "S99zram-advisor"),
    ("/etc/rc0.d", "K01zram-advisor"),
    ("/etc/rc6.d", "K01zram-advisor"),
];

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Exec error: {0}")]
    Exec(#[from] ExecError),
    #[error("neither systemd nor sysvinit detected, cannot manage a boot service")]
    UnsupportedInit,
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSystem {
    Systemd,
    SysVinit,
}

/// Probe the init system once. systemd leaves /run/systemd/system on
/// every boot; a populated /etc/init.d marks a sysvinit host.
pub fn detect() -> Result<InitSystem> {
    if Path::new("/run/systemd/system").is_dir() {
        Ok(InitSystem::Systemd)
    } else if Path::new("/etc/init.d").is_dir() {
        Ok(InitSystem::SysVinit)
    } else {
        Err(ServiceError::UnsupportedInit)
    }
}

/// Arguments baked into the installed service definition.
fn baked_command(spec: &SizingSpec) -> String {
    format!(
        "{} load {} --devices {}",
        INSTALL_PATH,
        spec.tokens(),
        spec.device_count
    )
}

fn systemd_unit(spec: &SizingSpec) -> String {
    format!(
        "[Unit]\n\
         Description=zRAM swap sized by zram-advisor\n\
         After=local-fs.target\n\
         \n\
         [Service]\n\
         Type=oneshot\n\
         RemainAfterExit=yes\n\
         ExecStart={exec}\n\
         ExecStop={install} unload\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        exec = baked_command(spec),
        install = INSTALL_PATH,
    )
}

fn initd_script(spec: &SizingSpec) -> String {
    format!(
        "#!/bin/sh\n\
         ### BEGIN INIT INFO\n\
         # Provides:          {name}\n\
         # Required-Start:    $local_fs\n\
         # Required-Stop:\n\
         # Default-Start:     2 3\n\
         # Default-Stop:      0 6\n\
         # Short-Description: zRAM swap sized by zram-advisor\n\
         ### END INIT INFO\n\
         \n\
         case \"$1\" in\n\
         start)\n\
         \t{exec}\n\
         \t;;\n\
         stop)\n\
         \t{install} unload\n\
         \t;;\n\
         *)\n\
         \techo \"Usage: $0 {{start|stop}}\" >&2\n\
         \texit 1\n\
         \t;;\n\
         esac\n",
        name = SERVICE_NAME,
        exec = baked_command(spec),
        install = INSTALL_PATH,
    )
}

/// Copy the running executable to the fixed install path. No-op when
/// already running from there.
fn install_executable(runner: &Runner) -> Result<()> {
    let exe = std::env::current_exe()?;
    if exe == Path::new(INSTALL_PATH) {
        info!("Already running from {}, skipping copy", INSTALL_PATH);
        return Ok(());
    }
    runner.copy_file(&exe, INSTALL_PATH)?;
    runner.run(&["chmod", "755", INSTALL_PATH])?;
    info!("Installed {}", INSTALL_PATH);
    Ok(())
}

/// Install the executable and boot service, then start it now. A
/// repeat setup overwrites the previous definition.
pub fn setup(runner: &Runner, spec: &SizingSpec) -> Result<()> {
    let init = detect()?;
    install_executable(runner)?;

    match init {
        InitSystem::Systemd => {
            runner.write_file(SYSTEMD_UNIT_PATH, &systemd_unit(spec))?;
            info!("Installed {}", SYSTEMD_UNIT_PATH);
            runner.run(&["systemctl", "daemon-reload"])?;
            runner.run(&[
                "systemctl",
                "enable",
                "--now",
                &format!("{}.service", SERVICE_NAME),
            ])?;
        }
        InitSystem::SysVinit => {
            runner.write_file(INITD_SCRIPT_PATH, &initd_script(spec))?;
            runner.run(&["chmod", "755", INITD_SCRIPT_PATH])?;
            info!("Installed {}", INITD_SCRIPT_PATH);
            for (dir, link) in RC_LINKS {
                runner.symlink(INITD_SCRIPT_PATH, &format!("{}/{}", dir, link))?;
            }
            runner.run(&[INITD_SCRIPT_PATH, "start"])?;
        }
    }

    info!("Boot service installed and started");
    Ok(())
}

/// Stop and remove the boot service, legacy log, and installed
/// executable. Reports a no-op when nothing was ever installed.
pub fn unsetup(runner: &Runner) -> Result<()> {
    let init = detect()?;
    let mut removed_any = false;

    match init {
        InitSystem::Systemd => {
            if Path::new(SYSTEMD_UNIT_PATH).exists() {
                let unit = format!("{}.service", SERVICE_NAME);
                if let Err(e) = runner.run(&["systemctl", "disable", "--now", &unit]) {
                    warn!("Could not stop {}: {}", unit, e);
                }
                removed_any |= runner.remove_file(SYSTEMD_UNIT_PATH)?;
                if let Err(e) = runner.run(&["systemctl", "daemon-reload"]) {
                    warn!("daemon-reload failed: {}", e);
                }
            }
        }
        InitSystem::SysVinit => {
            for (dir, link) in RC_LINKS {
                removed_any |= runner.remove_file(&format!("{}/{}", dir, link))?;
            }
            removed_any |= runner.remove_file(INITD_SCRIPT_PATH)?;
        }
    }

    removed_any |= runner.remove_file(LEGACY_LOG_PATH)?;
    removed_any |= runner.remove_file(INSTALL_PATH)?;

    if removed_any {
        info!("Boot service removed");
    } else {
        info!("Nothing installed, nothing to remove");
    }
    Ok(())
}
