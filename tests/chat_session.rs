use assert_matches::assert_matches;
use notarium::chat::{
    ChatMessage, ChatSession, ClientEvent, LoopbackHandle, LoopbackTransport, SendOutcome, ServerEvent,
    SessionStatus,
};
use notarium::moderation::{AdmissionFilter, ModerationPolicy};
use notarium::permissions::{Capability, Member, Role};
use notarium::Error;

const T: i64 = 1_717_200_000_000;

fn connect(member: Member) -> (ChatSession<LoopbackTransport>, LoopbackHandle) {
    let (transport, handle) = LoopbackTransport::pair();
    let filter = AdmissionFilter::with_builtin(ModerationPolicy::default(), Vec::<String>::new()).unwrap();
    let mut session = ChatSession::connect(member, transport, filter).unwrap();
    session.drain();
    (session, handle)
}

fn room(session: &mut ChatSession<LoopbackTransport>, handle: &LoopbackHandle, others: &[Member]) {
    let mut everyone = vec![session.member().clone()];
    everyone.extend_from_slice(others);
    assert!(handle.push(ServerEvent::OnlineUsers(everyone)));
    session.drain();
}

#[test]
fn presence_is_announced_once_and_channel_joined() {
    let (session, _handle) = connect(Member::new("1", "Ayşe", Role::User));
    let emitted = session.connection().transport().emitted();

    assert_eq!(
        emitted.iter().map(ClientEvent::name).collect::<Vec<_>>(),
        vec!["userOnline", "joinChannel"]
    );
    assert_eq!(session.channel().id, "ders-yardim");
}

#[test]
fn accepted_message_round_trips_through_server() {
    let (mut session, _handle) = connect(Member::new("1", "Ayşe", Role::User));

    let outcome = session.send("kimya çalışalım", T).unwrap();
    assert_matches!(outcome, SendOutcome::Sent(ref m) => {
        assert_eq!(m.user, "Ayşe");
        assert_eq!(m.channel, "ders-yardim");
    });
    session.drain();
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].message, "kimya çalışalım");
}

#[test]
fn rapid_messages_mute_the_sender() {
    let (mut session, _handle) = connect(Member::new("1", "Ayşe", Role::User));

    assert_matches!(session.send("selam", T).unwrap(), SendOutcome::Sent(_));
    assert_matches!(session.send("selam", T + 100).unwrap(), SendOutcome::Sent(_));
    assert_eq!(
        session.send("selam", T + 200).unwrap(),
        SendOutcome::Rejected {
            reason: "temporarily muted for spam".into(),
            remaining_secs: 30,
        }
    );
    assert_matches!(
        session.send("iyi akşamlar", T + 10_000).unwrap(),
        SendOutcome::Rejected { remaining_secs: 21, .. }
    );

    assert_eq!(session.tick(T + 30_200), 0);
    assert_matches!(session.send("iyi akşamlar", T + 30_200).unwrap(), SendOutcome::Sent(_));
}

#[test]
fn profanity_is_never_emitted() {
    let (mut session, _handle) = connect(Member::new("1", "Ayşe", Role::User));
    let before = session.connection().transport().emitted().len();

    assert_matches!(
        session.send("sen bir salaksın", T).unwrap(),
        SendOutcome::Rejected { remaining_secs: 120, .. }
    );
    assert_eq!(session.connection().transport().emitted().len(), before);
    session.drain();
    assert!(session.messages().is_empty());
}

#[test]
fn announcements_are_staff_only() {
    let (mut user, _h1) = connect(Member::new("1", "Ayşe", Role::User));
    user.switch_channel("etkinlik-duyurular").unwrap();
    assert_eq!(
        user.send("duyuru", T).unwrap(),
        SendOutcome::NotPermitted(Capability::PostAnnouncement)
    );

    let (mut admin, _h2) = connect(Member::new("2", "Mehmet", Role::Admin));
    admin.switch_channel("etkinlik-duyurular").unwrap();
    assert_matches!(admin.send("duyuru", T).unwrap(), SendOutcome::Sent(_));
}

#[test]
fn history_replaces_messages_on_channel_switch() {
    let (mut session, handle) = connect(Member::new("1", "Ayşe", Role::User));
    session.send("selam", T).unwrap();
    session.drain();

    session.switch_channel("kampus-geyikleri").unwrap();
    session.drain();
    assert!(session.messages().is_empty());

    session.switch_channel("ders-yardim").unwrap();
    session.drain();
    assert_eq!(session.messages().len(), 1);

    let other = ChatMessage {
        id: T + 1,
        user: "Zeynep".into(),
        avatar: "👤".into(),
        message: "başka oda".into(),
        timestamp: "12:00".into(),
        channel: "sinav-taktikleri".into(),
    };
    handle.push(ServerEvent::NewMessage(other));
    session.drain();
    assert_eq!(session.messages().len(), 1);
}

#[test]
fn founder_bans_and_kicks_users() {
    let (mut founder, handle) = connect(Member::new("0", "Kurucu", Role::Founder));
    room(
        &mut founder,
        &handle,
        &[Member::new("1", "Ayşe", Role::User), Member::new("2", "Mehmet", Role::Admin)],
    );
    assert_eq!(founder.online_users().len(), 3);

    founder.ban("1").unwrap();
    founder.kick("2").unwrap();
    assert!(founder.online_users().iter().all(|m| m.id == "0"));

    let emitted = founder.connection().transport().emitted();
    assert!(emitted.contains(&ClientEvent::BanUser("1".into())));
    assert!(emitted.contains(&ClientEvent::KickUser("2".into())));
}

#[test]
fn nobody_acts_on_the_founder() {
    let (mut admin, handle) = connect(Member::new("2", "Mehmet", Role::Admin));
    room(&mut admin, &handle, &[Member::new("0", "Kurucu", Role::Founder)]);

    assert_matches!(
        admin.ban("0"),
        Err(Error::NotPermitted {
            role: Role::Admin,
            capability: Capability::BanUser
        })
    );
    assert_matches!(admin.kick("2"), Err(Error::NotPermitted { .. }));
    assert_matches!(admin.kick("missing"), Err(Error::UnknownMember(_)));
}

#[test]
fn users_cannot_moderate() {
    let (mut user, handle) = connect(Member::new("1", "Ayşe", Role::User));
    room(&mut user, &handle, &[Member::new("3", "Can", Role::User)]);
    assert_matches!(user.kick("3"), Err(Error::NotPermitted { .. }));
    assert_matches!(user.grant_admin("3"), Err(Error::NotPermitted { .. }));
}

#[test]
fn admin_role_changes_follow_current_role() {
    let (mut founder, handle) = connect(Member::new("0", "Kurucu", Role::Founder));
    room(&mut founder, &handle, &[Member::new("3", "Can", Role::User)]);

    founder.grant_admin("3").unwrap();
    assert_eq!(founder.online_users()[1].role, Role::Admin);
    assert_matches!(founder.grant_admin("3"), Err(Error::NotPermitted { .. }));

    founder.revoke_admin("3").unwrap();
    assert_eq!(founder.online_users()[1].role, Role::User);
}

#[test]
fn banned_event_ends_the_session() {
    let (mut session, handle) = connect(Member::new("1", "Ayşe", Role::User));
    assert!(handle.push(ServerEvent::Banned));
    session.drain();

    assert_eq!(session.status(), SessionStatus::Banned);
    assert!(session.connection().transport().is_closed());
    assert_matches!(session.send("selam", T), Err(Error::Disconnected));
}

#[test]
fn kicked_event_ends_the_session() {
    let (mut session, handle) = connect(Member::new("1", "Ayşe", Role::User));
    handle.push(ServerEvent::Kicked);
    session.drain();

    assert_eq!(session.status(), SessionStatus::Kicked);
    assert_matches!(session.switch_channel("kampus-geyikleri"), Err(Error::Disconnected));
}

#[test]
fn server_errors_are_kept_for_display() {
    let (mut session, handle) = connect(Member::new("1", "Ayşe", Role::User));
    handle.push(ServerEvent::ErrorMessage("yavaş ol".into()));
    session.drain();
    assert_eq!(session.last_error(), Some("yavaş ol"));
    assert_eq!(session.status(), SessionStatus::Active);
}

#[test]
fn logout_closes_once() {
    let (mut session, _handle) = connect(Member::new("1", "Ayşe", Role::User));
    session.logout();
    session.logout();
    assert_eq!(session.status(), SessionStatus::LoggedOut);
    assert!(!session.connection().is_open());
}
