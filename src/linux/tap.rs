use std;

use libc;

use core::relay::Transport;
use linux::libc as _libc;
use {
    Error,
    Result,
};

/// [TAP interface](https://www.kernel.org/doc/Documentation/networking/tuntap.txt)
/// standing in for the downstream transport, so the attached host is the
/// Linux machine itself.
pub struct Tap {
    fd: libc::c_int,
    max_transmission_unit: usize,
}

impl Tap {
    /// Creates or binds to an existing TAP interface with the specified name.
    ///
    /// # Errors
    ///
    /// An IO error if any of the operations in [tun_alloc]
    /// (https://www.kernel.org/doc/Documentation/networking/tuntap.txt) fail.
    pub fn new(ifr_name: &str) -> Result<Tap> {
        let ifreq = match _libc::c_ifreq::with_name(ifr_name) {
            Some(ifreq) => ifreq,
            None => return Err(Error::Unknown("TAP name too long")),
        };

        unsafe {
            let fd = libc::open(
                "/dev/net/tun\0".as_ptr() as *const libc::c_char,
                libc::O_RDWR,
            );

            if fd == -1 {
                return Err(Error::IO(std::io::Error::last_os_error()));
            }

            let mut _ifreq = ifreq;
            _ifreq.ifr_ifru.ifr_flags = _libc::IFF_TAP | _libc::IFF_NO_PI;
            if libc::ioctl(fd, _libc::TUNSETIFF, &mut _ifreq as *mut _libc::c_ifreq) == -1 {
                let err = std::io::Error::last_os_error();
                libc::close(fd);
                return Err(Error::IO(err));
            }

            let mut _ifreq = ifreq;
            let max_transmission_unit = match Self::inet_ioctl(_libc::SIOCGIFMTU, &mut _ifreq) {
                Ok(()) => _ifreq.ifr_ifru.ifr_mtu as usize,
                Err(err) => {
                    libc::close(fd);
                    return Err(err);
                }
            };

            debug!("Opened TAP {} with MTU {}.", ifr_name, max_transmission_unit);

            Ok(Tap {
                fd,
                max_transmission_unit,
            })
        }
    }

    fn inet_ioctl(request: libc::c_ulong, ifreq: &mut _libc::c_ifreq) -> Result<()> {
        unsafe {
            let fd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);

            if fd == -1 {
                return Err(Error::IO(std::io::Error::last_os_error()));
            }

            if libc::ioctl(fd, request, ifreq as *mut _libc::c_ifreq) == -1 {
                let err = std::io::Error::last_os_error();
                libc::close(fd);
                return Err(Error::IO(err));
            }

            libc::close(fd);
            Ok(())
        }
    }

    /// Creates a second handle on the same TAP, e.g. for reading frames on
    /// one thread while the bridge transmits on another.
    pub fn try_clone(&self) -> Result<Tap> {
        let fd = unsafe { libc::dup(self.fd) };
        if fd == -1 {
            return Err(Error::IO(std::io::Error::last_os_error()));
        }

        Ok(Tap {
            fd,
            max_transmission_unit: self.max_transmission_unit,
        })
    }

    /// Blocks until a frame arrives, returning its length.
    pub fn recv(&mut self, buffer: &mut [u8]) -> Result<usize> {
        unsafe {
            let read = libc::read(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            );

            if read < 0 {
                Err(Error::IO(std::io::Error::last_os_error()))
            } else {
                Ok(read as usize)
            }
        }
    }

    pub fn max_transmission_unit(&self) -> usize {
        self.max_transmission_unit
    }
}

impl Transport for Tap {
    fn ready(&self) -> bool {
        true
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        unsafe {
            let wrote = libc::write(
                self.fd,
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
            );

            if wrote < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::WouldBlock {
                    Err(Error::Busy)
                } else {
                    Err(Error::IO(err))
                }
            } else {
                Ok(())
            }
        }
    }
}

impl Drop for Tap {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
