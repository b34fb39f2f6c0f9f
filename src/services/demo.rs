//! 백엔드에서 게시글을 불러오지 못했을 때 보여주는 데모 게시글
//!
//! 작성 시각은 호출 시점 기준 상대값입니다.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Comment, Post};

fn comment(
    id: &str,
    post_id: &str,
    content: &str,
    author: &str,
    user_id: &str,
    created_at: DateTime<Utc>,
) -> Comment {
    Comment {
        id: id.to_string(),
        post_id: post_id.to_string(),
        content: content.to_string(),
        user_id: user_id.to_string(),
        author_name: author.to_string(),
        created_at,
    }
}

pub fn demo_posts_at(now: DateTime<Utc>) -> Vec<Post> {
    vec![
        Post {
            id: "demo-1".to_string(),
            title: "Selamat Datang di Biawak Foundation!".to_string(),
            content: "Selamat datang di komunitas blockchain dan cryptocurrency Indonesia. \
                      Mari kita belajar dan berbagi pengetahuan bersama!"
                .to_string(),
            user_id: "demo-user-1".to_string(),
            author_name: "Admin Biawak".to_string(),
            created_at: now - Duration::days(1),
            comments: vec![comment(
                "demo-comment-1",
                "demo-1",
                "Terima kasih! Senang bisa bergabung dengan komunitas ini.",
                "Pengguna Demo",
                "demo-user-2",
                now - Duration::hours(12),
            )],
        },
        Post {
            id: "demo-2".to_string(),
            title: "Memahami Dasar-Dasar Blockchain".to_string(),
            content: "Blockchain adalah teknologi yang mendasari cryptocurrency. \
                      Mari kita pelajari konsep dasar blockchain dan bagaimana cara kerjanya.\n\n\
                      Blockchain pada dasarnya adalah buku besar digital yang tersebar di banyak \
                      komputer. Setiap blok berisi informasi transaksi yang telah diverifikasi \
                      dan dikaitkan dengan blok sebelumnya."
                .to_string(),
            user_id: "demo-user-3".to_string(),
            author_name: "Edukator Crypto".to_string(),
            created_at: now - Duration::days(2),
            comments: vec![
                comment(
                    "demo-comment-2",
                    "demo-2",
                    "Penjelasan yang sangat bagus! Saya jadi lebih mengerti tentang blockchain.",
                    "Pemula Crypto",
                    "demo-user-4",
                    now - Duration::days(1),
                ),
                comment(
                    "demo-comment-3",
                    "demo-2",
                    "Apakah ada rekomendasi resource lain untuk belajar blockchain?",
                    "Pengguna Baru",
                    "demo-user-5",
                    now - Duration::hours(6),
                ),
            ],
        },
        Post {
            id: "demo-3".to_string(),
            title: "Tips Keamanan Cryptocurrency".to_string(),
            content: "Keamanan adalah hal yang sangat penting dalam dunia cryptocurrency. \
                      Berikut beberapa tips untuk menjaga keamanan aset crypto Anda:\n\n\
                      1. Gunakan hardware wallet untuk penyimpanan jangka panjang\n\
                      2. Aktifkan 2FA di semua exchange\n\
                      3. Jangan pernah share private key\n\
                      4. Selalu verifikasi alamat wallet sebelum mengirim\n\
                      5. Buat backup seed phrase dan simpan di tempat yang aman"
                .to_string(),
            user_id: "demo-user-6".to_string(),
            author_name: "Security Expert".to_string(),
            created_at: now - Duration::days(3),
            comments: Vec::new(),
        },
    ]
}

pub fn demo_posts() -> Vec<Post> {
    demo_posts_at(Utc::now())
}

pub fn is_demo_post(post_id: &str) -> bool {
    post_id.starts_with("demo-")
}
