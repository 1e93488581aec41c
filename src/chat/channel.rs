use crate::error::{Error, Result};
use crate::permissions::{has_capability, Capability, Member};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    /// Announcement channels only accept posts from staff.
    pub announcement: bool,
}

impl Channel {
    pub fn required_capability(&self) -> Capability {
        if self.announcement {
            Capability::PostAnnouncement
        } else {
            Capability::SendMessage
        }
    }

    pub fn can_post(&self, member: &Member) -> bool {
        has_capability(member, self.required_capability())
    }
}

pub const CHANNELS: [Channel; 4] = [
    Channel {
        id: "ders-yardim",
        name: "Ders Yardım Odası",
        icon: "📚",
        announcement: false,
    },
    Channel {
        id: "sinav-taktikleri",
        name: "Sınav Taktikleri",
        icon: "🎯",
        announcement: false,
    },
    Channel {
        id: "kampus-geyikleri",
        name: "Kampüs Geyikleri",
        icon: "😄",
        announcement: false,
    },
    Channel {
        id: "etkinlik-duyurular",
        name: "Etkinlik Duyuruları",
        icon: "📢",
        announcement: true,
    },
];

pub const DEFAULT_CHANNEL: &str = "ders-yardim";

pub fn find_channel(id: &str) -> Result<&'static Channel> {
    CHANNELS
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| Error::UnknownChannel(id.to_string()))
}
