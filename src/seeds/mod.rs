pub mod src_club_seed;
